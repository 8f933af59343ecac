//! Gemini embedding provider over the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::DEFAULT_EMBED_MODEL;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default Generative Language API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "Gemini";

/// The API accepts at most this many texts per batch request.
const MAX_BATCH: usize = 100;

/// An [`EmbeddingProvider`] backed by Gemini `embedContent` /
/// `batchEmbedContents`.
///
/// Queries are embedded with the `RETRIEVAL_QUERY` task type and document
/// chunks with `RETRIEVAL_DOCUMENT`.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::new("your-api-key")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Output size of `models/embedding-001`.
    const DEFAULT_DIMENSIONS: usize = 768;

    /// Create a provider for `models/embedding-001`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("Gemini API key must not be empty".to_string()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            model: DEFAULT_EMBED_MODEL.to_string(),
            dimensions: Self::DEFAULT_DIMENSIONS,
        })
    }

    /// Use a different embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model =
            if model.starts_with("models/") { model } else { format!("models/{model}") };
        self
    }

    /// Declare the output size of a non-default model.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Point the provider at a different API base (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}:{method}", self.base_url.trim_end_matches('/'), self.model)
    }

    fn request<'a>(&'a self, text: &'a str, task_type: &'static str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.model,
            content: Content { parts: vec![Part { text }] },
            task_type,
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .http
            .post(self.url(method))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                embedding_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "embedding API error");
            return Err(embedding_error(format!("API returned {status}: {body}")));
        }

        response.json().await.map_err(|e| embedding_error(format!("malformed response: {e}")))
    }
}

fn embedding_error(message: String) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.to_string(), message }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct BatchEmbedContentsRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding query");
        let response: EmbedContentResponse =
            self.post("embedContent", &self.request(text, "RETRIEVAL_QUERY")).await?;
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            debug!(provider = PROVIDER, batch_size = batch.len(), "embedding batch");
            let body = BatchEmbedContentsRequest {
                requests: batch
                    .iter()
                    .map(|text| self.request(text, "RETRIEVAL_DOCUMENT"))
                    .collect(),
            };
            let response: BatchEmbedContentsResponse =
                self.post("batchEmbedContents", &body).await?;
            if response.embeddings.len() != batch.len() {
                return Err(embedding_error(format!(
                    "expected {} embeddings, received {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
