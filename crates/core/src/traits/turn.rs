//! Turn detection trait and types

use crate::{Result, VadEvent};
use std::time::Duration;

/// Turn-taking state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Waiting for the user to speak
    #[default]
    Idle,
    /// User is speaking
    UserSpeaking,
    /// User paused, evaluating whether the turn is complete
    Evaluating,
    /// Turn complete, ready for a response
    TurnComplete,
    /// Agent is responding
    AgentSpeaking,
}

/// Outcome of one detector step
#[derive(Debug, Clone)]
pub struct TurnDecision {
    /// State after processing
    pub state: TurnState,
    /// Whether the user's turn is complete
    pub is_turn_complete: bool,
    /// Confidence that the turn is complete, in [0.0, 1.0]
    pub confidence: f32,
    /// Silence observed since the user stopped speaking
    pub silence: Duration,
}

/// Turn detector interface.
///
/// Consumes VAD events plus transcript updates and decides when the speaker
/// has finished an utterance. A decision only reports a completed turn when
/// its confidence reaches the configured threshold.
pub trait TurnDetector: Send + Sync + 'static {
    /// Advance the detector with the latest VAD event and, when available,
    /// the current transcript of the utterance in progress.
    fn process(&self, vad: VadEvent, transcript: Option<&str>) -> Result<TurnDecision>;

    /// Mark that the agent started speaking; user turn tracking is suspended
    fn mark_agent_speaking(&self);

    /// Mark that the agent finished speaking; return to listening
    fn mark_agent_done(&self);

    /// Reset all turn state
    fn reset(&self);

    /// Configured completion threshold
    fn threshold(&self) -> f32;

    /// Detector identifier for logging and configuration reporting
    fn detector_info(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(TurnState::default(), TurnState::Idle);
    }
}
