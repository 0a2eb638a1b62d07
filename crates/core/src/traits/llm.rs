//! Language model trait

use crate::{Message, Result};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Language model interface.
///
/// Implementations wrap a chat-completion service. The conversation flow
/// supplies the full message list (system prompt plus history) on each call.
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate a complete response for the given messages
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Stream a response as text deltas.
    ///
    /// Deltas concatenate to the same text `generate` would return.
    fn generate_stream<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;

    /// Configured model identifier, for logging and configuration reporting
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoLlm;

    #[async_trait]
    impl LanguageModel for EchoLlm {
        async fn generate(&self, messages: &[Message]) -> Result<String> {
            Ok(messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default())
        }

        fn generate_stream<'a>(
            &'a self,
            messages: &'a [Message],
        ) -> Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>> {
            let text = messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Box::pin(futures::stream::once(async move { Ok(text) }))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn echo_generates_last_message() {
        let llm = EchoLlm;
        let out = llm.generate(&[Message::user("ping")]).await.unwrap();
        assert_eq!(out, "ping");
    }
}
