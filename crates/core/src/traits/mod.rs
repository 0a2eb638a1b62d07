//! Trait seams between the session driver and pipeline stages

pub mod llm;
pub mod speech;
pub mod turn;
pub mod vad;

pub use llm::LanguageModel;
pub use speech::{SpeechToText, TextToSpeech};
pub use turn::{TurnDecision, TurnDetector, TurnState};
pub use vad::{VadConfig, VadEvent, VadState, VoiceActivityDetector};
