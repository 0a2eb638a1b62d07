//! OpenAI chat-completions backend
//!
//! Thin client over the OpenAI API. Supports blocking generation and SSE
//! streaming; failures map to typed errors with no retry at this layer.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use cascade_core::{LanguageModel, Message, Result, Role};

use crate::LlmError;

/// Configuration for the OpenAI backend
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key, read from `OPENAI_API_KEY` by default
    pub api_key: String,
    /// Chat model identifier
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// API endpoint, overridable for tests and proxies
    pub endpoint: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: "gpt-4o".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
            endpoint: "https://api.openai.com".to_string(),
        }
    }
}

impl OpenAiConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct ChatStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat backend
pub struct OpenAiLlm {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiLlm {
    /// Create a new backend; fails when no API key is configured
    pub fn new(config: OpenAiConfig) -> std::result::Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration(
                "OPENAI_API_KEY not set. Set it via environment or config.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| ChatMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                }
                .to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    fn request(&self, messages: &[Message], stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(messages),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: stream.then_some(true),
        }
    }

    async fn complete(&self, messages: &[Message]) -> std::result::Result<String, LlmError> {
        let request = self.request(messages, false);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.endpoint))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response carried no choices".to_string()))
    }

    /// Parse one SSE payload line into a text delta, if it carries one
    fn parse_sse_data(data: &str) -> Option<String> {
        if data == "[DONE]" {
            return None;
        }
        let chunk: ChatStreamChunk = serde_json::from_str(data).ok()?;
        chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|s| !s.is_empty())
    }
}

#[async_trait]
impl LanguageModel for OpenAiLlm {
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let text = self.complete(messages).await?;
        tracing::debug!(model = %self.config.model, chars = text.len(), "llm response");
        Ok(text)
    }

    fn generate_stream<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>> {
        let request = self.request(messages, true);
        let url = format!("{}/v1/chat/completions", self.config.endpoint);

        Box::pin(async_stream::try_stream! {
            let response = self
                .client
                .post(url)
                .bearer_auth(&self.config.api_key)
                .json(&request)
                .send()
                .await
                .map_err(LlmError::from)?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)))?;
            } else {
                let mut body = response.bytes_stream();
                let mut buffer = String::new();

                while let Some(chunk) = body.next().await {
                    let chunk = chunk.map_err(LlmError::from)?;
                    buffer.push_str(&String::from_utf8_lossy(&chunk));

                    // SSE events are newline-delimited; keep the trailing
                    // incomplete line in the buffer.
                    while let Some(pos) = buffer.find('\n') {
                        let line = buffer[..pos].trim().to_string();
                        buffer.drain(..=pos);

                        if let Some(data) = line.strip_prefix("data: ") {
                            if let Some(delta) = Self::parse_sse_data(data) {
                                yield delta;
                            }
                        }
                    }
                }
            }
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
