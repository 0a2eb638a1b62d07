//! Text-to-speech stage

mod elevenlabs;

pub use elevenlabs::{ElevenLabsConfig, ElevenLabsTts};
