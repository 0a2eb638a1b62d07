//! Hybrid turn detector
//!
//! Combines VAD silence tracking with a lexical completeness heuristic.
//! The silence window adapts to the utterance: text that reads complete
//! shortens the window, text that trails off stretches it toward the
//! configured maximum.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::time::{Duration, Instant};

use cascade_core::{Result, TurnDecision, TurnDetector, TurnState, VadEvent};

/// Words that usually mean the speaker intends to continue
static TRAILING_CONTINUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(and|but|or|so|because|with|to|the|a|an|um|uh)$")
        .expect("static pattern compiles")
});

/// Configuration for hybrid turn detection
#[derive(Debug, Clone)]
pub struct TurnDetectorConfig {
    /// Completion confidence threshold in [0.0, 1.0]
    pub threshold: f32,
    /// Base silence window before a pause is treated as a turn boundary (ms)
    pub base_silence_ms: u32,
    /// Upper bound for the dynamic silence window (ms)
    pub max_silence_ms: u32,
}

impl Default for TurnDetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            base_silence_ms: 600,
            max_silence_ms: 1600,
        }
    }
}

struct Internal {
    state: TurnState,
    silence_start: Option<Instant>,
    transcript: String,
    completeness: f32,
    dynamic_window: Duration,
}

impl Internal {
    fn fresh(config: &TurnDetectorConfig) -> Self {
        Self {
            state: TurnState::Idle,
            silence_start: None,
            transcript: String::new(),
            completeness: 0.0,
            dynamic_window: Duration::from_millis(config.base_silence_ms as u64),
        }
    }
}

/// Hybrid turn detector
pub struct HybridTurnDetector {
    config: TurnDetectorConfig,
    internal: Mutex<Internal>,
}

impl HybridTurnDetector {
    pub fn new(config: TurnDetectorConfig) -> Self {
        let internal = Mutex::new(Internal::fresh(&config));
        Self { config, internal }
    }

    /// Score how complete the utterance text reads, in [0.0, 1.0]
    fn completeness_score(text: &str) -> f32 {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return 0.0;
        }
        if trimmed.ends_with('.') || trimmed.ends_with('?') || trimmed.ends_with('!') {
            return 0.9;
        }
        let bare = trimmed.trim_end_matches([',', '-']);
        if trimmed.ends_with(',') || trimmed.ends_with('-') || TRAILING_CONTINUATION.is_match(bare)
        {
            return 0.2;
        }
        0.6
    }

    /// Silence window for the given completeness: complete utterances get the
    /// base window, trailing-off ones stretch toward the maximum.
    fn window_for(&self, completeness: f32) -> Duration {
        let base = self.config.base_silence_ms as f32;
        let max = self.config.max_silence_ms as f32;
        let ms = base + (max - base) * (1.0 - completeness);
        Duration::from_millis(ms as u64)
    }
}

impl TurnDetector for HybridTurnDetector {
    fn process(&self, vad: VadEvent, transcript: Option<&str>) -> Result<TurnDecision> {
        let now = Instant::now();
        let mut internal = self.internal.lock();

        if matches!(internal.state, TurnState::AgentSpeaking) {
            return Ok(TurnDecision {
                state: TurnState::AgentSpeaking,
                is_turn_complete: false,
                confidence: 0.0,
                silence: Duration::ZERO,
            });
        }

        if let Some(text) = transcript {
            if !text.is_empty() {
                internal.transcript = text.to_string();
                internal.completeness = Self::completeness_score(text);
                internal.dynamic_window = self.window_for(internal.completeness);
            }
        }

        match vad {
            VadEvent::SpeechStart | VadEvent::SpeechContinue { .. } => {
                internal.state = TurnState::UserSpeaking;
                internal.silence_start = None;
            },
            VadEvent::SpeechEnd => {
                if matches!(internal.state, TurnState::UserSpeaking) {
                    internal.state = TurnState::Evaluating;
                    internal.silence_start = Some(now);
                }
            },
            VadEvent::Silence => {},
        }

        let silence = internal
            .silence_start
            .map(|s| now.duration_since(s))
            .unwrap_or(Duration::ZERO);

        let mut confidence = 0.0;
        let mut is_turn_complete = false;

        if matches!(internal.state, TurnState::Evaluating) {
            let window = internal.dynamic_window;
            let silence_score = (silence.as_secs_f32() / window.as_secs_f32()).min(1.0);
            confidence = 0.5 * internal.completeness + 0.5 * silence_score;

            let window_elapsed = silence >= window && confidence >= self.config.threshold;
            let hard_timeout = silence >= Duration::from_millis(self.config.max_silence_ms as u64);

            if !internal.transcript.trim().is_empty() && (window_elapsed || hard_timeout) {
                internal.state = TurnState::TurnComplete;
                is_turn_complete = true;
                if hard_timeout {
                    confidence = confidence.max(self.config.threshold);
                }
            }
        }

        Ok(TurnDecision {
            state: internal.state,
            is_turn_complete,
            confidence,
            silence,
        })
    }

    fn mark_agent_speaking(&self) {
        let mut internal = self.internal.lock();
        internal.state = TurnState::AgentSpeaking;
        internal.silence_start = None;
        internal.transcript.clear();
        internal.completeness = 0.0;
    }

    fn mark_agent_done(&self) {
        let mut internal = self.internal.lock();
        if matches!(internal.state, TurnState::AgentSpeaking) {
            internal.state = TurnState::Idle;
        }
    }

    fn reset(&self) {
        *self.internal.lock() = Internal::fresh(&self.config);
    }

    fn threshold(&self) -> f32 {
        self.config.threshold
    }

    fn detector_info(&self) -> &str {
        "hybrid-turn-detector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> HybridTurnDetector {
        HybridTurnDetector::new(TurnDetectorConfig {
            threshold: 0.8,
            base_silence_ms: 10,
            max_silence_ms: 60,
        })
    }

    #[test]
    fn completeness_heuristic() {
        assert!(HybridTurnDetector::completeness_score("When is my next service due?") > 0.8);
        assert!(HybridTurnDetector::completeness_score("I was wondering about the") < 0.3);
        assert!(HybridTurnDetector::completeness_score("check the tire pressure") > 0.5);
        assert_eq!(HybridTurnDetector::completeness_score("   "), 0.0);
    }

    #[test]
    fn complete_sentence_ends_turn_after_silence() {
        let detector = detector();

        let decision = detector.process(VadEvent::SpeechStart, None).unwrap();
        assert_eq!(decision.state, TurnState::UserSpeaking);

        detector
            .process(VadEvent::SpeechEnd, Some("When is my next service due?"))
            .unwrap();

        std::thread::sleep(Duration::from_millis(20));
        let decision = detector.process(VadEvent::Silence, None).unwrap();
        assert!(decision.is_turn_complete);
        assert!(decision.confidence >= 0.8);
        assert_eq!(decision.state, TurnState::TurnComplete);
    }

    #[test]
    fn trailing_off_waits_longer() {
        let detector = detector();

        detector.process(VadEvent::SpeechStart, None).unwrap();
        detector
            .process(VadEvent::SpeechEnd, Some("I was wondering about the"))
            .unwrap();

        // Base window elapsed but the utterance reads incomplete
        std::thread::sleep(Duration::from_millis(20));
        let decision = detector.process(VadEvent::Silence, None).unwrap();
        assert!(!decision.is_turn_complete);

        // Hard timeout eventually closes the turn
        std::thread::sleep(Duration::from_millis(60));
        let decision = detector.process(VadEvent::Silence, None).unwrap();
        assert!(decision.is_turn_complete);
    }

    #[test]
    fn resumed_speech_cancels_evaluation() {
        let detector = detector();

        detector.process(VadEvent::SpeechStart, None).unwrap();
        detector
            .process(VadEvent::SpeechEnd, Some("Hold on."))
            .unwrap();
        let decision = detector
            .process(VadEvent::SpeechContinue { probability: 0.9 }, None)
            .unwrap();
        assert_eq!(decision.state, TurnState::UserSpeaking);
        assert!(!decision.is_turn_complete);
    }

    #[test]
    fn empty_transcript_never_completes() {
        let detector = detector();

        detector.process(VadEvent::SpeechStart, None).unwrap();
        detector.process(VadEvent::SpeechEnd, None).unwrap();

        std::thread::sleep(Duration::from_millis(80));
        let decision = detector.process(VadEvent::Silence, None).unwrap();
        assert!(!decision.is_turn_complete);
    }

    #[test]
    fn agent_speaking_suspends_detection() {
        let detector = detector();

        detector.mark_agent_speaking();
        let decision = detector.process(VadEvent::SpeechStart, None).unwrap();
        assert_eq!(decision.state, TurnState::AgentSpeaking);
        assert!(!decision.is_turn_complete);

        detector.mark_agent_done();
        let decision = detector.process(VadEvent::Silence, None).unwrap();
        assert_eq!(decision.state, TurnState::Idle);
    }

    #[test]
    fn configured_threshold_exposed() {
        assert!((detector().threshold() - 0.8).abs() < f32::EPSILON);
    }
}
