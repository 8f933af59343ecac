//! The streaming LLM client trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::params::GenerationParams;

/// A lazy, finite, non-restartable sequence of generated text fragments.
///
/// Replaying a generation means issuing a new request. Dropping the stream
/// abandons the underlying connection; there is no other cancellation.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A single-prompt generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// The model identifier, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// The fully assembled prompt.
    pub prompt: String,
    /// Sampling parameters.
    pub params: GenerationParams,
}

impl GenerationRequest {
    /// Create a request with default parameters.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self { model: model.into(), prompt: prompt.into(), params: GenerationParams::default() }
    }

    /// Replace the sampling parameters.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// A hosted chat model that streams its answer.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_model::{GenerationRequest, Llm, collect_fragments};
///
/// let stream = llm.generate_stream(GenerationRequest::new("gemini-2.0-flash", prompt)).await?;
/// let text = collect_fragments(stream).await?;
/// ```
#[async_trait]
pub trait Llm: Send + Sync {
    /// A short provider name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Issue the request and return the fragment stream.
    ///
    /// Failures that happen before the first fragment (connection errors,
    /// non-success status) are returned directly; failures after that are
    /// yielded as the stream's final item.
    async fn generate_stream(&self, request: GenerationRequest) -> Result<FragmentStream>;
}
