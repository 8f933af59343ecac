//! Error types for the `buddy-search` crate.

use thiserror::Error;

/// Errors that can occur during a paper search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request could not be sent or the connection failed.
    #[error("Search request failed: {0}")]
    Request(String),

    /// The search API answered with a non-success status other than quota
    /// exhaustion.
    #[error("Search API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the API.
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("Malformed search response: {0}")]
    Decode(String),

    /// Invalid credentials or parameters.
    #[error("Search configuration error: {0}")]
    Config(String),
}

/// A convenience result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
