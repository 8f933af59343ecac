//! Scripted LLM for tests and offline runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream;

use crate::error::{ModelError, Result};
use crate::llm::{FragmentStream, GenerationRequest, Llm};

/// An [`Llm`] that replays a fixed list of fragments.
///
/// Optionally ends the stream with a failure, which exercises the same path
/// as a provider dropping mid-generation. Every call is counted and the most
/// recent request is kept for inspection.
#[derive(Debug, Default)]
pub struct MockLlm {
    fragments: Vec<String>,
    failure: Option<String>,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl MockLlm {
    /// Replay `fragments` in order.
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fragments: fragments.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    /// Fail immediately with `message` as the provider diagnostic.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { failure: Some(message.into()), ..Self::default() }
    }

    /// Yield the scripted fragments, then fail with `message`.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of `generate_stream` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_stream(&self, request: GenerationRequest) -> Result<FragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(request);
        }

        let mut items: Vec<Result<String>> = self.fragments.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.failure {
            items.push(Err(ModelError::generation("mock", message.clone())));
        }
        Ok(Box::pin(stream::iter(items)))
    }
}
