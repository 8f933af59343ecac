//! Configuration for the document pipeline.
//!
//! Every task (summarize, report, answer) has its own chunking settings and
//! model allow-list. Defaults:
//!
//! | Task | chunk_size | chunk_overlap | default model |
//! |------|-----------:|--------------:|---------------|
//! | summarize | 1500 | 150 | `gemini-2.5-pro-exp-03-25` |
//! | report | 2000 | 200 | `gemini-2.0-flash` |
//! | answer | 1000 | 200 | `Llama3-8b-8192` |

use std::fmt;

use buddy_model::ModelCatalog;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Embedding model used for chunk and query vectors.
pub const DEFAULT_EMBED_MODEL: &str = "models/embedding-001";

/// Number of chunks retrieved for question answering.
pub const DEFAULT_TOP_K: usize = 4;

/// The three generation tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Clustered document summary.
    Summarize,
    /// Structured research report.
    Report,
    /// Retrieval-backed question answering.
    Answer,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Summarize => "summarize",
            Self::Report => "report",
            Self::Answer => "answer",
        })
    }
}

/// Chunk window settings, in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Maximum number of characters shared by consecutive chunks.
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Create chunking settings.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Chunking plus model selection for one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSettings {
    /// How documents are split for this task.
    pub chunking: ChunkingConfig,
    /// Which models the task may use.
    pub models: ModelCatalog,
}

impl TaskSettings {
    fn summarize() -> Self {
        Self {
            chunking: ChunkingConfig::new(1500, 150),
            models: ModelCatalog::new(
                "gemini-2.5-pro-exp-03-25",
                "High-quality detailed summarization",
            )
            .with_model("gemini-2.0-flash", "Fast and efficient summarization"),
        }
    }

    fn report() -> Self {
        Self {
            chunking: ChunkingConfig::new(2000, 200),
            models: ModelCatalog::new("gemini-2.0-flash", "Fast report generation")
                .with_model("gemini-2.5-pro-exp-03-25", "Detailed and comprehensive reports"),
        }
    }

    fn answer() -> Self {
        Self {
            chunking: ChunkingConfig::new(1000, 200),
            models: ModelCatalog::new("Llama3-8b-8192", "Fast question answering")
                .with_model("gemini-2.5-pro-exp-03-25", "Detailed and accurate answers"),
        }
    }
}

/// Configuration for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Settings for summaries.
    pub summarize: TaskSettings,
    /// Settings for reports.
    pub report: TaskSettings,
    /// Settings for question answering.
    pub answer: TaskSettings,
    /// Embedding model name.
    pub embed_model: String,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Return cluster representatives in source order instead of cluster order.
    pub preserve_document_order: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            summarize: TaskSettings::summarize(),
            report: TaskSettings::report(),
            answer: TaskSettings::answer(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            preserve_document_order: false,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Settings for `task`.
    pub fn task(&self, task: TaskKind) -> &TaskSettings {
        match task {
            TaskKind::Summarize => &self.summarize,
            TaskKind::Report => &self.report,
            TaskKind::Answer => &self.answer,
        }
    }

    fn task_mut(&mut self, task: TaskKind) -> &mut TaskSettings {
        match task {
            TaskKind::Summarize => &mut self.summarize,
            TaskKind::Report => &mut self.report,
            TaskKind::Answer => &mut self.answer,
        }
    }

    /// Check every setting; used by the builder and after deserializing.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        for task in [TaskKind::Summarize, TaskKind::Report, TaskKind::Answer] {
            let settings = self.task(task);
            settings
                .chunking
                .validate()
                .map_err(|e| RagError::ConfigError(format!("{task}: {e}")))?;
            settings
                .models
                .validate()
                .map_err(|e| RagError::ConfigError(format!("{task}: {e}")))?;
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.embed_model.is_empty() {
            return Err(RagError::ConfigError("embed_model must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the chunk window for a task.
    pub fn chunking(mut self, task: TaskKind, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.config.task_mut(task).chunking = ChunkingConfig::new(chunk_size, chunk_overlap);
        self
    }

    /// Replace a task's model allow-list.
    pub fn models(mut self, task: TaskKind, models: ModelCatalog) -> Self {
        self.config.task_mut(task).models = models;
        self
    }

    /// Set the embedding model.
    pub fn embed_model(mut self, model: impl Into<String>) -> Self {
        self.config.embed_model = model.into();
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Return summary representatives in source order.
    pub fn preserve_document_order(mut self, preserve: bool) -> Self {
        self.config.preserve_document_order = preserve;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - any `chunk_overlap >= chunk_size` or `chunk_size == 0`
    /// - a task's default model is not on its allow-list
    /// - `top_k == 0`
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_task_table() {
        let config = RagConfig::default();
        assert_eq!(config.summarize.chunking, ChunkingConfig::new(1500, 150));
        assert_eq!(config.report.chunking, ChunkingConfig::new(2000, 200));
        assert_eq!(config.answer.chunking, ChunkingConfig::new(1000, 200));
        assert_eq!(config.summarize.models.default, "gemini-2.5-pro-exp-03-25");
        assert_eq!(config.report.models.default, "gemini-2.0-flash");
        assert_eq!(config.answer.models.default, "Llama3-8b-8192");
        assert_eq!(config.embed_model, "models/embedding-001");
        assert_eq!(config.top_k, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_rejects_overlap_not_below_size() {
        let err = RagConfig::builder().chunking(TaskKind::Report, 100, 100).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(msg) if msg.contains("report")));
    }

    #[test]
    fn builder_rejects_zero_top_k_and_zero_size() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().chunking(TaskKind::Answer, 0, 0).build().is_err());
    }

    #[test]
    fn builder_rejects_default_model_outside_allow_list() {
        let mut catalog = ModelCatalog::new("gemini-2.0-flash", "fast");
        catalog.default = "gpt-4".into();
        assert!(RagConfig::builder().models(TaskKind::Summarize, catalog).build().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: RagConfig =
            serde_json::from_str(r#"{"top_k": 6, "preserve_document_order": true}"#).unwrap();
        assert_eq!(config.top_k, 6);
        assert!(config.preserve_document_order);
        assert_eq!(config.answer.chunking.chunk_size, 1000);
    }
}
