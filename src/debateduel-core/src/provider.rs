//! The model provider boundary.
//!
//! Each operation sends one rendered prompt and gets back the raw text of
//! the model's reply. Structure is checked later, by the caller.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::ModelConfig;
use crate::error::DebateError;

/// A language model that answers a single prompt.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Submit `prompt` and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, DebateError>;
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// API key for authentication.
    pub api_key: String,
    pub model: ModelConfig,
}

impl ProviderSettings {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>, model: ModelConfig) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            model,
        }
    }
}

/// Chat-completion provider for OpenAI-compatible APIs.
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    model: ModelConfig,
}

impl OpenAIProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, DebateError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.model.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.model.connect_timeout_secs))
            .build()
            .map_err(|e| {
                DebateError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.api_base);

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
            model: settings.model,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model.name
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    async fn complete(&self, prompt: &str) -> Result<String, DebateError> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: prompt.to_string().into(),
                name: None,
            },
        )];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model.name)
            .max_completion_tokens(self.model.max_tokens)
            .temperature(self.model.temperature)
            .messages(messages)
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        debug!(model = %self.model.name, reply_len = content.len(), "completion received");

        if content.trim().is_empty() {
            return Err(DebateError::ModelError(format!(
                "model '{}' returned an empty completion",
                self.model.name
            )));
        }
        Ok(content)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_builds_without_network() {
        let settings = ProviderSettings::new(
            "http://localhost:11434/v1",
            "test-key",
            ModelConfig::default(),
        );
        let provider = OpenAIProvider::new(settings).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = mock::ScriptedProvider::new(vec![
            Ok("first".to_string()),
            Err(DebateError::ModelError("down".to_string())),
        ]);
        assert_eq!(provider.complete("a").await.unwrap(), "first");
        assert!(matches!(
            provider.complete("b").await,
            Err(DebateError::ModelError(_))
        ));
        assert_eq!(provider.prompts(), vec!["a", "b"]);
    }
}
