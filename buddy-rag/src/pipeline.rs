//! Document pipeline orchestrator.
//!
//! The [`RagPipeline`] composes an [`EmbeddingProvider`], a [`VectorStore`]
//! and an [`Llm`] into the three user-facing tasks:
//!
//! - **summarize**: chunk → embed → cluster → prompt → stream → reassemble → fix Markdown
//! - **report**: chunk → embed → cluster → prompt → stream → reassemble
//! - **answer**: embed question → top-k search → prompt → stream → reassemble
//!
//! # Example
//!
//! ```rust,ignore
//! use buddy_rag::{RagPipeline, RagConfig, PersistentVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(PersistentVectorStore::open("./vector_db")))
//!     .llm(Arc::new(router))
//!     .build()?;
//!
//! let summary = pipeline.summarize(&document, None).await?;
//! ```

use std::sync::Arc;

use buddy_model::{
    FragmentStream, GenerationParams, GenerationRequest, Llm, collect_fragments, fix_markdown,
};
use serde::Serialize;
use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::clustering::{ClusteringFilter, cluster_count};
use crate::config::{RagConfig, TaskKind};
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::prompt::{PromptInput, assemble};
use crate::vectorstore::VectorStore;

/// A generated summary or report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Generation {
    /// The generated Markdown.
    pub text: String,
    /// The model that produced it.
    pub model: String,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
    /// Number of representative chunks sent to the model.
    pub section_count: usize,
}

/// An answer to a question over the ingested documents.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The generated answer.
    pub text: String,
    /// The model that produced it.
    pub model: String,
    /// The retrieved chunks the answer was grounded on.
    pub sources: Vec<SearchResult>,
}

/// A prepared generation whose fragments have not been read yet.
pub struct PreparedStream {
    /// The model producing the fragments.
    pub model: String,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
    /// The fragment stream.
    pub fragments: FragmentStream,
}

/// The document pipeline orchestrator. Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    llm: Arc<dyn Llm>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Split a document with the chunk window configured for `task`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyDocument`] if no chunk comes out.
    pub fn chunk(&self, task: TaskKind, document: &Document) -> Result<Vec<Chunk>> {
        let chunker = RecursiveChunker::from_config(&self.config.task(task).chunking);
        let chunks = chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, %task, chunk_count = 0, "document has no text");
            return Err(RagError::EmptyDocument(document.source.clone()));
        }
        Ok(chunks)
    }

    async fn embed_chunks(&self, document: &Document, chunks: &mut [Chunk]) -> Result<()> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed");
            e
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: "pipeline".to_string(),
                message: format!(
                    "expected {} embeddings for document '{}', received {}",
                    chunks.len(),
                    document.id,
                    embeddings.len()
                ),
            });
        }
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }
        Ok(())
    }

    /// Chunk, embed and cluster a document, returning the chunk count and
    /// the representative chunks.
    async fn select_sections(&self, task: TaskKind, document: &Document) -> Result<(usize, Vec<Chunk>)> {
        let mut chunks = self.chunk(task, document)?;
        self.embed_chunks(document, &mut chunks).await?;

        let doc_length = chunks.len();
        let num_clusters = cluster_count(doc_length);
        let sections = ClusteringFilter::new()
            .with_preserve_document_order(self.config.preserve_document_order)
            .select(&chunks, num_clusters)?;
        info!(
            document.id = %document.id,
            %task,
            chunk_count = doc_length,
            cluster_count = sections.len(),
            "selected sections"
        );
        Ok((doc_length, sections))
    }

    async fn start_generation(
        &self,
        task: TaskKind,
        document: &Document,
        model: Option<&str>,
    ) -> Result<(PreparedStream, usize)> {
        let (doc_length, sections) = self.select_sections(task, document).await?;
        let texts: Vec<&str> = sections.iter().map(|c| c.text.as_str()).collect();
        let prompt = match task {
            TaskKind::Summarize => assemble(&PromptInput::Summarize { doc_length, sections: &texts }),
            _ => assemble(&PromptInput::Report { sections: &texts }),
        };

        let model = self.config.task(task).models.resolve(model).to_string();
        let request = GenerationRequest::new(&model, prompt)
            .with_params(GenerationParams::for_document_length(doc_length));
        let fragments = self.llm.generate_stream(request).await.map_err(|e| {
            error!(document.id = %document.id, %task, model = %model, error = %e, "generation failed");
            RagError::from(e)
        })?;
        Ok((PreparedStream { model, chunk_count: doc_length, fragments }, sections.len()))
    }

    /// Summarize a document.
    ///
    /// Short documents (fewer than ten chunks) get a single-context prompt;
    /// longer ones a sectioned prompt. The result is Markdown-repaired.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyDocument`] if the document has no text
    /// - [`RagError::EmbeddingError`] if embedding fails
    /// - [`RagError::Generation`] if the model fails, carrying its diagnostic
    pub async fn summarize(&self, document: &Document, model: Option<&str>) -> Result<Generation> {
        let (stream, section_count) =
            self.start_generation(TaskKind::Summarize, document, model).await?;
        let text = collect_fragments(stream.fragments).await?;
        info!(document.id = %document.id, model = %stream.model, summary_len = text.len(), "summary complete");
        Ok(Generation {
            text: fix_markdown(&text),
            model: stream.model,
            chunk_count: stream.chunk_count,
            section_count,
        })
    }

    /// Generate a structured research report. The text is returned verbatim.
    ///
    /// # Errors
    ///
    /// As for [`summarize`](Self::summarize).
    pub async fn report(&self, document: &Document, model: Option<&str>) -> Result<Generation> {
        let (stream, section_count) =
            self.start_generation(TaskKind::Report, document, model).await?;
        let text = collect_fragments(stream.fragments).await?;
        info!(document.id = %document.id, model = %stream.model, report_len = text.len(), "report complete");
        Ok(Generation { text, model: stream.model, chunk_count: stream.chunk_count, section_count })
    }

    /// Start a report and hand back the raw fragment stream.
    pub async fn report_stream(&self, document: &Document, model: Option<&str>) -> Result<PreparedStream> {
        let (stream, _) = self.start_generation(TaskKind::Report, document, model).await?;
        Ok(stream)
    }

    /// Chunk, embed and store a document for question answering.
    ///
    /// Returns the stored chunks.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyDocument`] if the document has no text
    /// - [`RagError::EmbeddingError`] or [`RagError::VectorStoreError`] on backend failure
    pub async fn ingest(&self, document: &Document) -> Result<Vec<Chunk>> {
        let mut chunks = self.chunk(TaskKind::Answer, document)?;
        self.embed_chunks(document, &mut chunks).await?;
        self.vector_store.upsert(&chunks).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
            e
        })?;
        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Whether any document has been ingested.
    pub async fn has_documents(&self) -> Result<bool> {
        self.vector_store.has_entries().await
    }

    /// Answer a question from the ingested documents.
    ///
    /// The language model is not called when the store is empty.
    ///
    /// # Errors
    ///
    /// - [`RagError::NoDocuments`] if nothing has been ingested
    /// - [`RagError::PipelineError`] if the question is blank
    /// - [`RagError::Generation`] if the model fails
    pub async fn answer(&self, question: &str, model: Option<&str>) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::PipelineError("question must not be empty".to_string()));
        }
        if !self.has_documents().await? {
            info!("question asked before any document was ingested");
            return Err(RagError::NoDocuments);
        }

        let query_embedding = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;
        let sources = self.vector_store.search(&query_embedding, self.config.top_k).await?;
        let context: Vec<&str> = sources.iter().map(|r| r.chunk.text.as_str()).collect();
        let prompt = assemble(&PromptInput::Answer { question, context: &context });

        let model = self.config.answer.models.resolve(model).to_string();
        let stream = self.llm.generate_stream(GenerationRequest::new(&model, prompt)).await?;
        let text = collect_fragments(stream).await.map_err(|e| {
            error!(model = %model, error = %e, "answer generation failed");
            RagError::from(e)
        })?;
        info!(model = %model, source_count = sources.len(), "answered question");
        Ok(Answer { text, model, sources })
    }
}

/// Builder for constructing a [`RagPipeline`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    llm: Option<Arc<dyn Llm>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default()`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider (required).
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store (required).
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the language model client (required).
    pub fn llm(mut self, llm: Arc<dyn Llm>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required component is missing
    /// or the configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let llm = self.llm.ok_or_else(|| RagError::ConfigError("llm is required".to_string()))?;
        Ok(RagPipeline { config, embedding_provider, vector_store, llm })
    }
}
