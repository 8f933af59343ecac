//! Directory-backed vector store that survives restarts.
//!
//! Chunks live in `{dir}/chunks.jsonl`, one JSON object per line, in
//! insertion order. Opening a store performs no I/O; the file is read on the
//! first operation and then served from memory. Plain upserts append; a
//! deduplicating upsert that replaces entries rewrites the file through a
//! temporary file and an atomic rename.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, ensure_embedded, merge_chunks, rank};

const BACKEND: &str = "Persistent";
const FILE_NAME: &str = "chunks.jsonl";

/// A [`VectorStore`] persisted as JSON lines in a directory.
///
/// Only one process should write a given directory at a time.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_rag::{PersistentVectorStore, VectorStore};
///
/// let store = PersistentVectorStore::open("./vector_db");
/// if store.has_entries().await? { /* answer questions */ }
/// ```
#[derive(Debug)]
pub struct PersistentVectorStore {
    dir: PathBuf,
    deduplicate: bool,
    chunks: RwLock<Option<Vec<Chunk>>>,
}

impl PersistentVectorStore {
    /// Open (or lazily create) the store in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), deduplicate: false, chunks: RwLock::new(None) }
    }

    /// Replace entries with the same chunk id instead of duplicating them.
    pub fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    /// The directory holding the data file.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self) -> PathBuf {
        self.dir.join(FILE_NAME)
    }

    async fn read_file(&self) -> Result<Vec<Chunk>> {
        let path = self.file_path();
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read vector store");
                return Err(RagError::store(BACKEND, format!("failed to read {}: {e}", path.display())));
            }
        };

        // A file that does not end in a newline was cut short mid-append.
        let complete = contents.is_empty() || contents.ends_with('\n');
        let line_count = contents.lines().count();
        let mut chunks = Vec::new();
        for (line_number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Chunk>(line) {
                Ok(chunk) => chunks.push(chunk),
                Err(e) if !complete && line_number + 1 == line_count => {
                    warn!(path = %path.display(), line = line_number + 1, error = %e, "discarding torn entry");
                }
                Err(e) => {
                    return Err(RagError::store(
                        BACKEND,
                        format!("corrupt entry at {}:{}: {e}", path.display(), line_number + 1),
                    ));
                }
            }
        }
        if !complete {
            self.rewrite(&chunks).await?;
        }
        info!(path = %path.display(), chunk_count = chunks.len(), "loaded vector store");
        Ok(chunks)
    }

    /// Populate the cache if this is the first access.
    async fn ensure_loaded(&self) -> Result<()> {
        if self.chunks.read().await.is_some() {
            return Ok(());
        }
        let mut guard = self.chunks.write().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        Ok(())
    }

    async fn append(&self, chunks: &[Chunk]) -> Result<()> {
        let mut buffer = String::new();
        for chunk in chunks {
            buffer.push_str(&encode(chunk)?);
            buffer.push('\n');
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_path())
            .await
            .map_err(io_error)?;
        let start = file.metadata().await.map_err(io_error)?.len();

        let written = match file.write_all(buffer.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(truncate) = file.set_len(start).await {
                error!(error = %truncate, "failed to roll back partial append");
            }
            return Err(io_error(e));
        }
        Ok(())
    }

    async fn rewrite(&self, chunks: &[Chunk]) -> Result<()> {
        let mut buffer = String::new();
        for chunk in chunks {
            buffer.push_str(&encode(chunk)?);
            buffer.push('\n');
        }
        let temp = self.dir.join(format!("{FILE_NAME}.tmp"));
        tokio::fs::write(&temp, buffer).await.map_err(io_error)?;
        tokio::fs::rename(&temp, self.file_path()).await.map_err(io_error)
    }
}

fn encode(chunk: &Chunk) -> Result<String> {
    serde_json::to_string(chunk)
        .map_err(|e| RagError::store(BACKEND, format!("failed to encode chunk '{}': {e}", chunk.id)))
}

fn io_error(e: std::io::Error) -> RagError {
    error!(error = %e, "vector store write failed");
    RagError::store(BACKEND, format!("write failed: {e}"))
}

#[async_trait]
impl VectorStore for PersistentVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        ensure_embedded(BACKEND, chunks)?;
        if chunks.is_empty() {
            return Ok(());
        }

        let mut guard = self.chunks.write().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        let Some(stored) = guard.as_mut() else {
            return Err(RagError::store(BACKEND, "store cache unavailable"));
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_error)?;
        let mut updated = stored.clone();
        let replaced = merge_chunks(&mut updated, chunks, self.deduplicate);
        if replaced {
            self.rewrite(&updated).await?;
        } else {
            self.append(chunks).await?;
        }
        *stored = updated;

        debug!(added = chunks.len(), total = stored.len(), replaced, "persisted chunks");
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        self.ensure_loaded().await?;
        let guard = self.chunks.read().await;
        Ok(guard.as_deref().map(|stored| rank(stored, embedding, top_k)).unwrap_or_default())
    }

    async fn has_entries(&self) -> Result<bool> {
        Ok(self.len().await? > 0)
    }

    async fn len(&self) -> Result<usize> {
        self.ensure_loaded().await?;
        Ok(self.chunks.read().await.as_ref().map_or(0, Vec::len))
    }
}
