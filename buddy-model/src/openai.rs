//! OpenAI-compatible chat completions client (Groq by default).
//!
//! This module is only available when the `openai` feature is enabled.

use async_openai::{
    Client,
    config::OpenAIConfig as AsyncOpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::llm::{FragmentStream, GenerationRequest, Llm};

/// Groq's OpenAI-compatible API base.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// API base URL. The OpenAI default when `None`.
    pub base_url: Option<String>,
    /// Provider name used in logs and error messages.
    pub provider: String,
}

impl OpenAIConfig {
    /// Settings for the public OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: None, provider: "OpenAI".to_string() }
    }

    /// Settings for Groq's OpenAI-compatible API.
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Some(GROQ_API_BASE.to_string()),
            provider: "Groq".to_string(),
        }
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// An [`Llm`] for OpenAI and OpenAI-compatible chat completion APIs.
pub struct OpenAIClient {
    client: Client<AsyncOpenAIConfig>,
    provider: String,
}

impl OpenAIClient {
    /// Create a new client.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::Config(format!(
                "{} API key must not be empty",
                config.provider
            )));
        }

        let mut openai_config = AsyncOpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self { client: Client::with_config(openai_config), provider: config.provider })
    }
}

#[async_trait]
impl Llm for OpenAIClient {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn generate_stream(&self, request: GenerationRequest) -> Result<FragmentStream> {
        let provider = self.provider.clone();
        debug!(provider = %provider, model = %request.model, "starting streamed chat completion");

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(request.prompt.as_str())
            .build()
            .map_err(|e| ModelError::Config(format!("failed to build message: {e}")))?;

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder
            .model(&request.model)
            .messages(vec![message.into()])
            .temperature(request.params.temperature);
        if let Some(top_p) = request.params.top_p {
            request_builder.top_p(top_p);
        }
        if let Some(max_tokens) = request.params.max_output_tokens {
            request_builder.max_tokens(max_tokens);
        }

        let openai_request = request_builder
            .build()
            .map_err(|e| ModelError::Config(format!("failed to build request: {e}")))?;

        let mut upstream =
            self.client.chat().create_stream(openai_request).await.map_err(|e| {
                error!(provider = %provider, error = %e, "request failed");
                ModelError::generation(&provider, format!("API error: {e}"))
            })?;

        let stream = try_stream! {
            while let Some(result) = upstream.next().await {
                let chunk = result.map_err(|e| {
                    ModelError::generation(&provider, format!("stream error: {e}"))
                })?;
                for choice in chunk.choices {
                    if let Some(content) = choice.delta.content {
                        if !content.is_empty() {
                            yield content;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groq_config_points_at_groq() {
        let config = OpenAIConfig::groq("gsk-test");
        assert_eq!(config.base_url.as_deref(), Some(GROQ_API_BASE));
        assert_eq!(config.provider, "Groq");
    }

    #[test]
    fn rejects_empty_api_key() {
        assert!(matches!(OpenAIClient::new(OpenAIConfig::groq("")), Err(ModelError::Config(_))));
    }
}
