//! Error types for the `buddy-model` crate.

use thiserror::Error;

/// Errors that can occur while talking to a hosted model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The remote call failed: transport error, timeout, non-success status,
    /// or a payload that could not be decoded. `message` carries the raw
    /// provider diagnostic.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The provider that produced the error.
        provider: String,
        /// The raw diagnostic returned by the provider.
        message: String,
    },

    /// A client or routing configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ModelError {
    pub(crate) fn generation(provider: &str, message: impl Into<String>) -> Self {
        Self::Generation { provider: provider.to_string(), message: message.into() }
    }
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
