//! ElevenLabs text-to-speech backend
//!
//! Requests 16kHz PCM output so synthesized audio drops straight into the
//! pipeline's frame format without resampling.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;

use cascade_core::{AudioFrame, Result, SampleRate, TextToSpeech};

use crate::PipelineError;

/// Configuration for the ElevenLabs backend
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    /// API key, read from `ELEVENLABS_API_KEY` by default
    pub api_key: String,
    /// Synthesis model
    pub model: String,
    /// Voice identifier
    pub voice_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// API endpoint, overridable for tests and proxies
    pub endpoint: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ELEVENLABS_API_KEY").unwrap_or_default(),
            model: "eleven_flash_v2_5".to_string(),
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            timeout: Duration::from_secs(30),
            endpoint: "https://api.elevenlabs.io".to_string(),
        }
    }
}

impl ElevenLabsConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// ElevenLabs text-to-speech backend
pub struct ElevenLabsTts {
    config: ElevenLabsConfig,
    client: Client,
}

impl ElevenLabsTts {
    /// Create a new backend; fails when no API key is configured
    pub fn new(config: ElevenLabsConfig) -> std::result::Result<Self, PipelineError> {
        if config.api_key.is_empty() {
            return Err(PipelineError::Configuration(
                "ELEVENLABS_API_KEY not set. Set it via environment or config.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Configured voice identifier
    pub fn voice_id(&self) -> &str {
        &self.config.voice_id
    }

    async fn speak(&self, text: &str) -> std::result::Result<AudioFrame, PipelineError> {
        let request = SynthesisRequest {
            text,
            model_id: &self.config.model,
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/text-to-speech/{}",
                self.config.endpoint, self.config.voice_id
            ))
            .query(&[("output_format", "pcm_16000")])
            .header("xi-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Tts(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Tts(format!("body read: {}", e)))?;

        if bytes.is_empty() {
            return Err(PipelineError::Tts("empty synthesis response".to_string()));
        }

        Ok(AudioFrame::from_pcm16(&bytes, SampleRate::Hz16000, 0))
    }
}

#[async_trait]
impl TextToSpeech for ElevenLabsTts {
    async fn synthesize(&self, text: &str) -> Result<AudioFrame> {
        let frame = self.speak(text).await?;
        tracing::debug!(
            model = %self.config.model,
            voice = %self.config.voice_id,
            samples = frame.len(),
            "synthesized utterance"
        );
        Ok(frame)
    }

    fn synthesize_stream<'a>(
        &'a self,
        text_stream: Pin<Box<dyn Stream<Item = String> + Send + 'a>>,
    ) -> Pin<Box<dyn Stream<Item = Result<AudioFrame>> + Send + 'a>> {
        Box::pin(async_stream::stream! {
            let mut text_stream = text_stream;
            while let Some(chunk) = text_stream.next().await {
                if chunk.trim().is_empty() {
                    continue;
                }
                match self.speak(&chunk).await {
                    Ok(frame) => yield Ok(frame),
                    Err(e) => yield Err(e.into()),
                }
            }
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
