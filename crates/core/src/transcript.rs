//! Transcript types produced by speech recognition

use serde::{Deserialize, Serialize};

/// Result of transcribing audio.
///
/// Partial results carry `is_final = false` and may be revised by later
/// results for the same utterance.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranscriptResult {
    /// Recognized text
    pub text: String,
    /// Recognizer confidence in [0.0, 1.0]
    pub confidence: f32,
    /// Whether this result is final for the utterance
    pub is_final: bool,
    /// BCP-47 language tag, when reported by the recognizer
    pub language: Option<String>,
}

impl TranscriptResult {
    /// Final transcript with the given text and confidence
    pub fn final_text(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            is_final: true,
            language: None,
        }
    }

    /// Partial (interim) transcript
    pub fn partial(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            is_final: false,
            language: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
