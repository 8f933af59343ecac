//! Gemini streaming client over the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_stream::try_stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::llm::{FragmentStream, GenerationRequest, Llm};

/// The default Generative Language API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "Gemini";

/// An [`Llm`] backed by Gemini's `streamGenerateContent` endpoint.
///
/// Responses are requested as server-sent events (`alt=sse`); each event
/// carries a partial `GenerateContentResponse` whose text parts become one
/// fragment.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_model::gemini::GeminiClient;
///
/// let client = GeminiClient::new(std::env::var("GOOGLE_API_KEY")?)?;
/// ```
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ModelError::Config("Gemini API key must not be empty".into()));
        }
        Ok(Self { http: reqwest::Client::new(), api_key, base_url: GEMINI_API_BASE.to_string() })
    }

    /// Create a client using the `GOOGLE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY").map_err(|_| {
            ModelError::Config("GOOGLE_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Point the client at a different API base (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn stream_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!(
            "{}/models/{model}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/')
        )
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

// ── Llm implementation ─────────────────────────────────────────────

#[async_trait]
impl Llm for GeminiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate_stream(&self, request: GenerationRequest) -> Result<FragmentStream> {
        debug!(
            provider = PROVIDER,
            model = %request.model,
            prompt_len = request.prompt.len(),
            "starting streamed generation"
        );

        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts: vec![Part { text: &request.prompt }] }],
            generation_config: GenerationConfig {
                temperature: request.params.temperature,
                top_p: request.params.top_p,
                max_output_tokens: request.params.max_output_tokens,
            },
        };

        let response = self
            .http
            .post(self.stream_url(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                ModelError::generation(PROVIDER, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "API error");
            return Err(ModelError::generation(PROVIDER, format!("API returned {status}: {body}")));
        }

        let mut events = Box::pin(response.bytes_stream().eventsource());
        let stream = try_stream! {
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| {
                    ModelError::generation(PROVIDER, format!("stream error: {e}"))
                })?;
                let chunk: GenerateContentResponse =
                    serde_json::from_str(&event.data).map_err(|e| {
                        ModelError::generation(
                            PROVIDER,
                            format!("malformed payload: {e}: {}", event.data),
                        )
                    })?;
                if let Some(api_error) = &chunk.error {
                    Err::<(), _>(ModelError::generation(PROVIDER, api_error.message.clone()))?;
                }
                let text = chunk.text();
                if !text.is_empty() {
                    yield text;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
