//! Error types shared across the workspace

use thiserror::Error;

/// Convenience result alias used throughout the core crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by pipeline stages and the session driver.
///
/// There is no retry or recovery policy at this layer; callers propagate
/// these upward and the worker decides how to exit.
#[derive(Error, Debug)]
pub enum Error {
    #[error("speech-to-text error: {0}")]
    Stt(String),

    #[error("text-to-speech error: {0}")]
    Tts(String),

    #[error("language model error: {0}")]
    Llm(String),

    #[error("voice activity detection error: {0}")]
    Vad(String),

    #[error("turn detection error: {0}")]
    Turn(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session error: {0}")]
    Session(String),
}

impl Error {
    /// Short category label used in logs and metrics
    pub fn category(&self) -> &'static str {
        match self {
            Error::Stt(_) => "stt",
            Error::Tts(_) => "tts",
            Error::Llm(_) => "llm",
            Error::Vad(_) => "vad",
            Error::Turn(_) => "turn",
            Error::Transport(_) => "transport",
            Error::Config(_) => "config",
            Error::Session(_) => "session",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_matches_variant() {
        assert_eq!(Error::Stt("x".into()).category(), "stt");
        assert_eq!(Error::Session("x".into()).category(), "session");
    }
}
