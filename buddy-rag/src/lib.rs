//! # buddy-rag
//!
//! Document processing and retrieval for Research Buddy.
//!
//! Uploaded files are extracted ([`extract`]), split ([`chunking`]),
//! embedded ([`embedding`]) and either clustered down to representative
//! sections ([`clustering`]) for summaries and reports, or stored in a
//! [`VectorStore`] for question answering. [`RagPipeline`] ties the steps
//! together and hands the assembled [`prompt`] to a `buddy_model::Llm`.
//!
//! ## Features
//!
//! - `gemini` (default): [`gemini::GeminiEmbeddingProvider`]

pub mod chunking;
pub mod clustering;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod inmemory;
pub mod persistent;
pub mod pipeline;
pub mod prompt;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;

pub use chunking::{Chunker, DEFAULT_SEPARATORS, RecursiveChunker};
pub use clustering::{Cluster, ClusteringFilter, cluster_count};
pub use config::{ChunkingConfig, RagConfig, RagConfigBuilder, TaskKind, TaskSettings};
pub use document::{Chunk, Document, DocumentKind, Page, SearchResult};
pub use embedding::{EmbeddingProvider, HashingEmbedder};
pub use error::{RagError, Result};
pub use extract::{extract_bytes, extract_document, load_document};
pub use inmemory::InMemoryVectorStore;
pub use persistent::PersistentVectorStore;
pub use pipeline::{Answer, Generation, PreparedStream, RagPipeline, RagPipelineBuilder};
pub use prompt::{PromptInput, assemble};
pub use vectorstore::{VectorStore, cosine_similarity};

#[cfg(feature = "gemini")]
pub use gemini::GeminiEmbeddingProvider;
