//! Energy-based voice activity detector
//!
//! Maps per-frame RMS energy to a speech probability and runs a debouncing
//! state machine around the configured threshold: speech start is confirmed
//! only after `min_speech_duration_ms` of consecutive speech, speech end
//! only after `min_silence_duration_ms` of consecutive silence.

use parking_lot::Mutex;

use cascade_core::{AudioFrame, VadConfig, VadEvent, VadState, VoiceActivityDetector};

/// RMS level at which speech probability saturates at 1.0. Conversational
/// speech over a decent microphone sits well above threshold at this scale.
const FULL_SCALE_RMS: f32 = 0.125;

struct Internal {
    state: VadState,
    speech_ms: f32,
    silence_ms: f32,
}

/// Energy-based voice activity detector
pub struct EnergyVad {
    config: VadConfig,
    internal: Mutex<Internal>,
}

impl EnergyVad {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            internal: Mutex::new(Internal {
                state: VadState::Idle,
                speech_ms: 0.0,
                silence_ms: 0.0,
            }),
        }
    }

    fn probability(frame: &AudioFrame) -> f32 {
        (frame.rms_energy() / FULL_SCALE_RMS).min(1.0)
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn process_frame(&self, audio: &AudioFrame) -> VadEvent {
        let probability = Self::probability(audio);
        let frame_ms = audio.duration.as_secs_f32() * 1000.0;
        let is_speech = probability >= self.config.threshold;

        let mut internal = self.internal.lock();
        match internal.state {
            VadState::Idle => {
                if is_speech {
                    internal.state = VadState::PendingSpeech;
                    internal.speech_ms = frame_ms;
                }
                VadEvent::Silence
            },
            VadState::PendingSpeech => {
                if is_speech {
                    internal.speech_ms += frame_ms;
                    if internal.speech_ms >= self.config.min_speech_duration_ms as f32 {
                        internal.state = VadState::InSpeech;
                        VadEvent::SpeechStart
                    } else {
                        VadEvent::Silence
                    }
                } else {
                    internal.state = VadState::Idle;
                    internal.speech_ms = 0.0;
                    VadEvent::Silence
                }
            },
            VadState::InSpeech => {
                if is_speech {
                    VadEvent::SpeechContinue { probability }
                } else {
                    internal.state = VadState::PendingSilence;
                    internal.silence_ms = frame_ms;
                    VadEvent::SpeechContinue { probability }
                }
            },
            VadState::PendingSilence => {
                if is_speech {
                    internal.state = VadState::InSpeech;
                    internal.silence_ms = 0.0;
                    VadEvent::SpeechContinue { probability }
                } else {
                    internal.silence_ms += frame_ms;
                    if internal.silence_ms >= self.config.min_silence_duration_ms as f32 {
                        internal.state = VadState::Idle;
                        internal.speech_ms = 0.0;
                        internal.silence_ms = 0.0;
                        VadEvent::SpeechEnd
                    } else {
                        VadEvent::SpeechContinue { probability }
                    }
                }
            },
        }
    }

    fn speech_probability(&self, audio: &AudioFrame) -> f32 {
        Self::probability(audio)
    }

    fn reset(&self) {
        let mut internal = self.internal.lock();
        internal.state = VadState::Idle;
        internal.speech_ms = 0.0;
        internal.silence_ms = 0.0;
    }

    fn state(&self) -> VadState {
        self.internal.lock().state
    }

    fn threshold(&self) -> f32 {
        self.config.threshold
    }

    fn detector_info(&self) -> &str {
        "energy-vad"
    }
}
