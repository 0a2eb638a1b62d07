//! Speech processing traits

use crate::{AudioFrame, Result, TranscriptResult};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Speech-to-Text interface.
///
/// Implementations are thin clients over a recognition service; the session
/// driver holds them as `Arc<dyn SpeechToText>`.
///
/// # Example
///
/// ```ignore
/// let stt: Arc<dyn SpeechToText> = Arc::new(DeepgramStt::new(config)?);
/// let transcript = stt.transcribe(&utterance).await?;
/// tracing::info!(text = %transcript.text, "transcribed");
/// ```
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe a complete utterance.
    ///
    /// Returns a final transcript with text and confidence.
    async fn transcribe(&self, audio: &AudioFrame) -> Result<TranscriptResult>;

    /// Stream transcription as audio arrives.
    ///
    /// Yields interim transcripts (`is_final = false`) followed by a final
    /// transcript once the input stream ends.
    fn transcribe_stream<'a>(
        &'a self,
        audio_stream: Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'a>>,
    ) -> Pin<Box<dyn Stream<Item = Result<TranscriptResult>> + Send + 'a>>;

    /// Configured model identifier, for logging and configuration reporting
    fn model_name(&self) -> &str;
}

/// Text-to-Speech interface.
///
/// # Example
///
/// ```ignore
/// let tts: Arc<dyn TextToSpeech> = Arc::new(ElevenLabsTts::new(config)?);
/// let audio = tts.synthesize("Hello!").await?;
/// ```
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    /// Synthesize text into one audio frame
    async fn synthesize(&self, text: &str) -> Result<AudioFrame>;

    /// Stream synthesis chunk-by-chunk.
    ///
    /// Each yielded frame corresponds to one input text chunk, which lets
    /// playback start before the full response text is available.
    fn synthesize_stream<'a>(
        &'a self,
        text_stream: Pin<Box<dyn Stream<Item = String> + Send + 'a>>,
    ) -> Pin<Box<dyn Stream<Item = Result<AudioFrame>> + Send + 'a>>;

    /// Configured model identifier, for logging and configuration reporting
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channels, SampleRate};

    struct MockStt;

    #[async_trait]
    impl SpeechToText for MockStt {
        async fn transcribe(&self, _audio: &AudioFrame) -> Result<TranscriptResult> {
            Ok(TranscriptResult::final_text("test transcription", 0.95))
        }

        fn transcribe_stream<'a>(
            &'a self,
            _audio_stream: Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'a>>,
        ) -> Pin<Box<dyn Stream<Item = Result<TranscriptResult>> + Send + 'a>> {
            Box::pin(futures::stream::empty())
        }

        fn model_name(&self) -> &str {
            "mock-stt"
        }
    }

    #[tokio::test]
    async fn mock_stt_transcribes() {
        let stt = MockStt;
        let frame = AudioFrame::new(vec![0.0; 160], SampleRate::Hz16000, Channels::Mono, 0);
        let result = stt.transcribe(&frame).await.unwrap();
        assert!(result.is_final);
        assert_eq!(result.text, "test transcription");
    }
}
