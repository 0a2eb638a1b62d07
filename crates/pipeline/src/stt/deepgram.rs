//! Deepgram speech-to-text backend
//!
//! Client over the Deepgram prerecorded endpoint. Utterance audio is
//! WAV-encoded in memory and posted per request; the streaming variant
//! buffers the input stream and emits interim transcripts on a fixed
//! cadence, then a final transcript when the stream ends.

use std::io::Cursor;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Deserialize;

use cascade_core::{AudioFrame, Result, SpeechToText, TranscriptResult};

use crate::PipelineError;

/// Interim transcript cadence for the streaming path, in buffered frames.
/// At 20ms frames this transcribes roughly once per second of speech.
const PARTIAL_EVERY_FRAMES: usize = 50;

/// Configuration for the Deepgram backend
#[derive(Debug, Clone)]
pub struct DeepgramConfig {
    /// API key, read from `DEEPGRAM_API_KEY` by default
    pub api_key: String,
    /// Recognition model
    pub model: String,
    /// BCP-47 language tag
    pub language: String,
    /// Request timeout
    pub timeout: Duration,
    /// API endpoint, overridable for tests and proxies
    pub endpoint: String,
}

impl Default for DeepgramConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("DEEPGRAM_API_KEY").unwrap_or_default(),
            model: "nova-2".to_string(),
            language: "en".to_string(),
            timeout: Duration::from_secs(30),
            endpoint: "https://api.deepgram.com".to_string(),
        }
    }
}

impl DeepgramConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Deserialize)]
struct ListenChannel {
    alternatives: Vec<ListenAlternative>,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    transcript: String,
    #[serde(default)]
    confidence: f32,
}

/// Deepgram speech-to-text backend
pub struct DeepgramStt {
    config: DeepgramConfig,
    client: Client,
}

impl DeepgramStt {
    /// Create a new backend; fails when no API key is configured
    pub fn new(config: DeepgramConfig) -> std::result::Result<Self, PipelineError> {
        if config.api_key.is_empty() {
            return Err(PipelineError::Configuration(
                "DEEPGRAM_API_KEY not set. Set it via environment or config.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Configured language tag
    pub fn language(&self) -> &str {
        &self.config.language
    }

    /// Encode a frame as a 16-bit PCM WAV in memory
    fn encode_wav(frame: &AudioFrame) -> std::result::Result<Vec<u8>, PipelineError> {
        let spec = hound::WavSpec {
            channels: frame.channels.count() as u16,
            sample_rate: frame.sample_rate.as_u32(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| PipelineError::Stt(format!("wav encode: {}", e)))?;
            for sample in frame.to_pcm16() {
                writer
                    .write_sample(sample)
                    .map_err(|e| PipelineError::Stt(format!("wav encode: {}", e)))?;
            }
            writer
                .finalize()
                .map_err(|e| PipelineError::Stt(format!("wav encode: {}", e)))?;
        }
        Ok(cursor.into_inner())
    }

    async fn listen(
        &self,
        frame: &AudioFrame,
    ) -> std::result::Result<TranscriptResult, PipelineError> {
        let wav = Self::encode_wav(frame)?;

        let response = self
            .client
            .post(format!("{}/v1/listen", self.config.endpoint))
            .query(&[
                ("model", self.config.model.as_str()),
                ("language", self.config.language.as_str()),
            ])
            .header("Authorization", format!("Token {}", self.config.api_key))
            .header("Content-Type", "audio/wav")
            .body(wav)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Stt(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let response: ListenResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Stt(format!("invalid response: {}", e)))?;

        let alternative = response
            .results
            .channels
            .into_iter()
            .next()
            .and_then(|c| c.alternatives.into_iter().next())
            .ok_or_else(|| PipelineError::Stt("response carried no alternatives".to_string()))?;

        let mut result = TranscriptResult::final_text(alternative.transcript, alternative.confidence);
        result.language = Some(self.config.language.clone());
        Ok(result)
    }
}

#[async_trait]
impl SpeechToText for DeepgramStt {
    async fn transcribe(&self, audio: &AudioFrame) -> Result<TranscriptResult> {
        let result = self.listen(audio).await?;
        tracing::debug!(
            model = %self.config.model,
            chars = result.text.len(),
            confidence = result.confidence,
            "transcribed utterance"
        );
        Ok(result)
    }

    fn transcribe_stream<'a>(
        &'a self,
        audio_stream: Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'a>>,
    ) -> Pin<Box<dyn Stream<Item = Result<TranscriptResult>> + Send + 'a>> {
        Box::pin(async_stream::stream! {
            let mut audio_stream = audio_stream;
            let mut buffered: Vec<AudioFrame> = Vec::new();
            let mut since_partial = 0usize;

            while let Some(frame) = audio_stream.next().await {
                buffered.push(frame);
                since_partial += 1;

                if since_partial >= PARTIAL_EVERY_FRAMES {
                    since_partial = 0;
                    if let Some(joined) = AudioFrame::concat(&buffered) {
                        match self.listen(&joined).await {
                            Ok(mut result) => {
                                result.is_final = false;
                                yield Ok(result);
                            },
                            Err(e) => yield Err(e.into()),
                        }
                    }
                }
            }

            if let Some(joined) = AudioFrame::concat(&buffered) {
                match self.listen(&joined).await {
                    Ok(result) => yield Ok(result),
                    Err(e) => yield Err(e.into()),
                }
            }
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::{Channels, SampleRate};

    #[test]
    fn missing_api_key_rejected() {
        let config = DeepgramConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            DeepgramStt::new(config),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn wav_encoding_has_header_and_samples() {
        let frame = AudioFrame::new(vec![0.0; 160], SampleRate::Hz16000, Channels::Mono, 0);
        let wav = DeepgramStt::encode_wav(&frame).unwrap();
        // RIFF header plus 160 samples at 2 bytes each
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert!(wav.len() >= 44 + 320);
    }

    #[test]
    fn response_parsing() {
        let json = r#"{
            "results": {
                "channels": [
                    {"alternatives": [{"transcript": "hello there", "confidence": 0.98}]}
                ]
            }
        }"#;
        let parsed: ListenResponse = serde_json::from_str(json).unwrap();
        let alt = &parsed.results.channels[0].alternatives[0];
        assert_eq!(alt.transcript, "hello there");
        assert!(alt.confidence > 0.9);
    }

    #[test]
    fn configured_literals_exposed() {
        let config = DeepgramConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        };
        let stt = DeepgramStt::new(config).unwrap();
        assert_eq!(stt.model_name(), "nova-2");
        assert_eq!(stt.language(), "en");
    }
}
