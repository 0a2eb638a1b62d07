//! Voice activity detection trait and types

use crate::AudioFrame;

/// Configuration for voice activity detection.
///
/// Controls sensitivity and the debouncing windows around speech boundaries.
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Speech probability threshold in [0.0, 1.0]. Frames at or above the
    /// threshold count as speech.
    pub threshold: f32,
    /// Consecutive speech required before speech start is confirmed (ms)
    pub min_speech_duration_ms: u32,
    /// Consecutive silence required before speech end is confirmed (ms)
    pub min_silence_duration_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_speech_duration_ms: 200,
            min_silence_duration_ms: 320,
        }
    }
}

impl VadConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Events emitted while processing an audio stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VadEvent {
    /// Speech confirmed after the minimum speech window
    SpeechStart,
    /// Speech continuing, with the probability of the current frame
    SpeechContinue { probability: f32 },
    /// Speech ended after the minimum silence window
    SpeechEnd,
    /// No speech in the current frame
    Silence,
}

impl VadEvent {
    /// Whether this event indicates active speech
    pub fn is_speech(&self) -> bool {
        matches!(self, Self::SpeechStart | Self::SpeechContinue { .. })
    }
}

/// Detector state tracking speech boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VadState {
    /// Waiting for speech
    #[default]
    Idle,
    /// Potential speech, waiting for the minimum speech window
    PendingSpeech,
    /// In a confirmed speech segment
    InSpeech,
    /// Potential end of speech, waiting for the minimum silence window
    PendingSilence,
}

/// Voice activity detector interface.
///
/// Implementations keep internal boundary state; `process_frame` advances it
/// one frame at a time and the session driver reacts to the returned event.
pub trait VoiceActivityDetector: Send + Sync + 'static {
    /// Advance the detector by one frame
    fn process_frame(&self, audio: &AudioFrame) -> VadEvent;

    /// Speech probability for a single frame, without advancing state
    fn speech_probability(&self, audio: &AudioFrame) -> f32;

    /// Reset boundary state, e.g. when a new conversation starts
    fn reset(&self);

    /// Current detector state
    fn state(&self) -> VadState;

    /// Configured speech threshold
    fn threshold(&self) -> f32;

    /// Detector identifier for logging and configuration reporting
    fn detector_info(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speech_events_classified() {
        assert!(VadEvent::SpeechStart.is_speech());
        assert!(VadEvent::SpeechContinue { probability: 0.9 }.is_speech());
        assert!(!VadEvent::SpeechEnd.is_speech());
        assert!(!VadEvent::Silence.is_speech());
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(VadState::default(), VadState::Idle);
    }
}
