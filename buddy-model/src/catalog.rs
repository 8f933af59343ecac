//! Per-task model allow-lists and prefix-based client routing.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ModelError, Result};
use crate::llm::{FragmentStream, GenerationRequest, Llm};

/// The models a task may use, with a human-readable description each, and
/// the one used when the caller asks for nothing (or something unknown).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelCatalog {
    /// Model used when the requested one is absent or not allowed.
    pub default: String,
    /// Allowed model names mapped to their descriptions.
    pub available: BTreeMap<String, String>,
}

impl ModelCatalog {
    /// A catalog containing only `default`.
    pub fn new(default: impl Into<String>, description: impl Into<String>) -> Self {
        let default = default.into();
        let mut available = BTreeMap::new();
        available.insert(default.clone(), description.into());
        Self { default, available }
    }

    /// Allow another model.
    pub fn with_model(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.available.insert(name.into(), description.into());
        self
    }

    /// Whether `name` is on the allow-list.
    pub fn contains(&self, name: &str) -> bool {
        self.available.contains_key(name)
    }

    /// The requested model if it is allowed, otherwise the default.
    pub fn resolve<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(name) if self.contains(name) => name,
            Some(name) => {
                warn!(requested = name, default = %self.default, "model not allowed, using default");
                &self.default
            }
            None => &self.default,
        }
    }

    /// Fails when the default model is not itself on the allow-list.
    pub fn validate(&self) -> Result<()> {
        if self.default.is_empty() {
            return Err(ModelError::Config("default model must not be empty".into()));
        }
        if !self.contains(&self.default) {
            return Err(ModelError::Config(format!(
                "default model '{}' is not in the available models",
                self.default
            )));
        }
        Ok(())
    }
}

/// Dispatches requests to the client registered for the model name's prefix.
///
/// Routes are checked in registration order; the first prefix that matches
/// (case-insensitively) wins. Unmatched models go to the fallback, if any.
///
/// ```rust,ignore
/// let router = ModelRouter::new()
///     .route("gemini", Arc::new(gemini))
///     .route("llama", Arc::new(groq));
/// ```
#[derive(Default)]
pub struct ModelRouter {
    routes: Vec<(String, Arc<dyn Llm>)>,
    fallback: Option<Arc<dyn Llm>>,
}

impl ModelRouter {
    /// An empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send models whose name starts with `prefix` to `llm`.
    pub fn route(mut self, prefix: impl Into<String>, llm: Arc<dyn Llm>) -> Self {
        self.routes.push((prefix.into().to_lowercase(), llm));
        self
    }

    /// Send unmatched models to `llm`.
    pub fn fallback(mut self, llm: Arc<dyn Llm>) -> Self {
        self.fallback = Some(llm);
        self
    }

    /// The client responsible for `model`.
    pub fn client_for(&self, model: &str) -> Result<&Arc<dyn Llm>> {
        let normalized = model.strip_prefix("models/").unwrap_or(model).to_lowercase();
        self.routes
            .iter()
            .find(|(prefix, _)| normalized.starts_with(prefix.as_str()))
            .map(|(_, llm)| llm)
            .or(self.fallback.as_ref())
            .ok_or_else(|| ModelError::Config(format!("no client registered for model '{model}'")))
    }
}

#[async_trait]
impl Llm for ModelRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn generate_stream(&self, request: GenerationRequest) -> Result<FragmentStream> {
        let llm = self.client_for(&request.model)?;
        debug!(model = %request.model, provider = llm.name(), "routing generation request");
        llm.generate_stream(request).await
    }
}
