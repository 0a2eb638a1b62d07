//! Core traits and types for the cascading voice agent
//!
//! This crate provides the foundational pieces used across all other crates:
//! - Trait seams for pluggable pipeline stages (STT, TTS, LLM, VAD, turn
//!   detection)
//! - Audio frame types
//! - Transcript and chat message types
//! - Error types

pub mod audio;
pub mod error;
pub mod message;
pub mod traits;
pub mod transcript;

pub use audio::{AudioFrame, Channels, SampleRate};
pub use error::{Error, Result};
pub use message::{Message, Role, Turn, TurnRole};
pub use transcript::TranscriptResult;

pub use traits::{
    LanguageModel,
    SpeechToText,
    TextToSpeech,
    TurnDecision,
    TurnDetector,
    TurnState,
    VadConfig,
    VadEvent,
    VadState,
    VoiceActivityDetector,
};
