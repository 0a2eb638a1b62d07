//! Audio frame types and utilities

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Supported audio sample rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SampleRate {
    /// 8kHz - telephony
    Hz8000,
    /// 16kHz - standard speech processing rate, used end to end in the pipeline
    #[default]
    Hz16000,
    /// 24kHz - some TTS services
    Hz24000,
    /// 48kHz - WebRTC capture
    Hz48000,
}

impl SampleRate {
    /// Sample rate as u32
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz24000 => 24000,
            SampleRate::Hz48000 => 48000,
        }
    }

    /// Number of samples in a 20ms frame at this rate
    pub fn frame_size_20ms(&self) -> usize {
        (self.as_u32() as usize * 20) / 1000
    }
}

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Channels {
    #[default]
    Mono,
    Stereo,
}

impl Channels {
    pub fn count(&self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}

/// A chunk of audio with metadata.
///
/// Samples are f32 normalized to [-1.0, 1.0]. The pipeline operates on
/// mono 16kHz frames throughout.
#[derive(Clone)]
pub struct AudioFrame {
    /// Raw audio samples
    pub samples: Arc<[f32]>,
    /// Sample rate
    pub sample_rate: SampleRate,
    /// Channel layout
    pub channels: Channels,
    /// Frame sequence number for ordering
    pub sequence: u64,
    /// Duration of this frame
    pub duration: Duration,
}

impl std::fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrame")
            .field("samples_len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("sequence", &self.sequence)
            .field("duration", &self.duration)
            .finish()
    }
}

impl AudioFrame {
    /// Create a frame from f32 samples
    pub fn new(
        samples: Vec<f32>,
        sample_rate: SampleRate,
        channels: Channels,
        sequence: u64,
    ) -> Self {
        let duration = Duration::from_secs_f64(
            samples.len() as f64 / (sample_rate.as_u32() as f64 * channels.count() as f64),
        );
        Self {
            samples: samples.into(),
            sample_rate,
            channels,
            sequence,
            duration,
        }
    }

    /// Decode 16-bit little-endian PCM bytes into a frame
    pub fn from_pcm16(bytes: &[u8], sample_rate: SampleRate, sequence: u64) -> Self {
        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / i16::MAX as f32)
            .collect();
        Self::new(samples, sample_rate, Channels::Mono, sequence)
    }

    /// Encode samples as 16-bit PCM, clamping out-of-range values
    pub fn to_pcm16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect()
    }

    /// RMS energy of the frame, 0.0 for an empty frame
    pub fn rms_energy(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum_squares / self.samples.len() as f32).sqrt()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Concatenate a sequence of frames into one, keeping the first frame's
    /// format and sequence number. Returns None when the input is empty.
    pub fn concat(frames: &[AudioFrame]) -> Option<AudioFrame> {
        let first = frames.first()?;
        let samples: Vec<f32> = frames.iter().flat_map(|f| f.samples.iter().copied()).collect();
        Some(AudioFrame::new(
            samples,
            first.sample_rate,
            first.channels,
            first.sequence,
        ))
    }
}
