//! services/api/src/adapters/llm.rs
//!
//! This module contains the adapter for the chat-completion LLM.
//! It implements the `CompletionService` port from the `core` crate against any
//! OpenAI-compatible endpoint (OpenRouter by default).

use async_openai::{
    config::OpenAIConfig,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use outreach_core::ports::{CompletionService, PortError, PortResult};
use tracing::debug;

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` using an OpenAI-compatible API.
///
/// Without an API key the adapter still constructs; every call then fails with
/// `ServiceUnavailable` so callers can fall back.
#[derive(Clone)]
pub struct OpenRouterAdapter {
    client: Option<Client<OpenAIConfig>>,
    model: String,
}

impl OpenRouterAdapter {
    /// Creates a new `OpenRouterAdapter`.
    pub fn new(api_key: Option<&str>, base_url: &str, model: String) -> Self {
        let client = api_key.map(|key| {
            let config = OpenAIConfig::new()
                .with_api_base(base_url)
                .with_api_key(key);
            Client::with_config(config)
        });
        Self { client, model }
    }
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OpenRouterAdapter {
    async fn complete(&self, prompt: &str, model: Option<&str>) -> PortResult<String> {
        let client = self.client.as_ref().ok_or_else(|| {
            PortError::ServiceUnavailable("LLM API key not configured".to_string())
        })?;

        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        #[allow(deprecated)]
        let request = CreateChatCompletionRequestArgs::default()
            .model(model.unwrap_or(&self.model))
            .messages(messages)
            .max_tokens(MAX_TOKENS)
            .temperature(TEMPERATURE)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Upstream(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                PortError::Upstream("LLM response contained no text content".to_string())
            })?;

        debug!("LLM completion returned {} chars", content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_a_configuration_error() {
        let adapter = OpenRouterAdapter::new(
            None,
            "https://openrouter.ai/api/v1",
            "anthropic/claude-3-haiku".to_string(),
        );
        let err = adapter.complete("hello", None).await.unwrap_err();
        assert!(matches!(err, PortError::ServiceUnavailable(_)));
    }
}
