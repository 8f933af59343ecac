//! Error types for the `buddy-rag` crate.

use thiserror::Error;

/// Errors that can occur in document processing and retrieval.
#[derive(Debug, Error)]
pub enum RagError {
    /// The file extension is not one of `pdf`, `docx`, `txt`.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The file could not be read or parsed.
    #[error("Extraction error ({source_name}): {message}")]
    ExtractionError {
        /// The file being extracted.
        source_name: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// Extraction and chunking produced no text.
    #[error("Document '{0}' contains no extractable text")]
    EmptyDocument(String),

    /// A question was asked before any document was ingested.
    #[error("No documents have been processed yet. Please upload a document first.")]
    NoDocuments,

    /// The language model failed.
    #[error(transparent)]
    Generation(#[from] buddy_model::ModelError),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    pub(crate) fn extraction(source_name: &str, message: impl Into<String>) -> Self {
        Self::ExtractionError { source_name: source_name.to_string(), message: message.into() }
    }

    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStoreError { backend: backend.to_string(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
