//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// A storage backend for embedded chunks with similarity search.
///
/// A store is a single logical collection. Whether re-adding a chunk id
/// replaces the old entry or creates a duplicate is chosen when the store is
/// built; duplicates are kept by default.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(&chunks).await?;
/// let results = store.search(&query_embedding, 4).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add chunks. Every chunk must carry an embedding.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Return the `top_k` chunks most similar to `embedding`.
    ///
    /// Results are ordered by descending cosine similarity; equal scores
    /// keep insertion order.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Whether at least one chunk is stored.
    async fn has_entries(&self) -> Result<bool>;

    /// Number of stored chunks.
    async fn len(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every chunk against `embedding` and keep the best `top_k`.
pub(crate) fn rank(chunks: &[Chunk], embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
    let mut scored: Vec<SearchResult> = chunks
        .iter()
        .map(|chunk| SearchResult {
            chunk: chunk.clone(),
            score: cosine_similarity(&chunk.embedding, embedding),
        })
        .collect();
    // Stable sort: ties stay in insertion order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    scored
}

pub(crate) fn ensure_embedded(backend: &str, chunks: &[Chunk]) -> Result<()> {
    match chunks.iter().find(|c| !c.is_embedded()) {
        Some(chunk) => Err(RagError::store(
            backend,
            format!("chunk '{}' has no embedding", chunk.id),
        )),
        None => Ok(()),
    }
}

/// Add `incoming` to `stored`. With `deduplicate`, chunks whose id is
/// already present replace the old entry in place. Returns whether any
/// entry was replaced.
pub(crate) fn merge_chunks(stored: &mut Vec<Chunk>, incoming: &[Chunk], deduplicate: bool) -> bool {
    let mut replaced = false;
    for chunk in incoming {
        if deduplicate {
            if let Some(existing) = stored.iter_mut().find(|c| c.id == chunk.id) {
                *existing = chunk.clone();
                replaced = true;
                continue;
            }
        }
        stored.push(chunk.clone());
    }
    replaced
}
