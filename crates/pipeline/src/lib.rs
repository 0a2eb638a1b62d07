//! Pipeline stages for the cascading voice agent
//!
//! The pipeline composes five stages behind the core trait seams:
//! speech-to-text (Deepgram), language model (OpenAI, via `cascade-llm`),
//! text-to-speech (ElevenLabs), voice activity detection, and turn
//! detection. `CascadingPipeline` assembles the five and hands them to the
//! session driver unchanged.

mod cascading;
pub mod stt;
pub mod tts;
pub mod turn;
pub mod vad;

pub use cascading::{CascadingPipeline, CascadingPipelineBuilder, StageSummary};
pub use stt::{DeepgramConfig, DeepgramStt};
pub use tts::{ElevenLabsConfig, ElevenLabsTts};
pub use turn::{HybridTurnDetector, TurnDetectorConfig};
pub use vad::EnergyVad;

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("stt backend error: {0}")]
    Stt(String),

    #[error("tts backend error: {0}")]
    Tts(String),

    #[error("missing pipeline stage: {0}")]
    MissingStage(&'static str),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        PipelineError::Network(e.to_string())
    }
}

impl From<PipelineError> for cascade_core::Error {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Stt(m) => cascade_core::Error::Stt(m),
            PipelineError::Tts(m) => cascade_core::Error::Tts(m),
            PipelineError::Network(m) => cascade_core::Error::Transport(m),
            other @ (PipelineError::MissingStage(_) | PipelineError::Configuration(_)) => {
                cascade_core::Error::Config(other.to_string())
            },
        }
    }
}
