//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps chunks in insertion order behind a
//! `tokio::sync::RwLock`. It is suitable for tests and single-process runs
//! where nothing needs to survive a restart.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;
use crate::vectorstore::{VectorStore, ensure_embedded, merge_chunks, rank};

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine similarity for search.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new().with_deduplication(true);
/// store.upsert(&chunks).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<Chunk>>,
    deduplicate: bool,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store that keeps duplicates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace entries with the same chunk id instead of duplicating them.
    pub fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        ensure_embedded(BACKEND, chunks)?;
        let mut stored = self.chunks.write().await;
        merge_chunks(&mut stored, chunks, self.deduplicate);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let stored = self.chunks.read().await;
        Ok(rank(&stored, embedding, top_k))
    }

    async fn has_entries(&self) -> Result<bool> {
        Ok(!self.chunks.read().await.is_empty())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.chunks.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: format!("text of {id}"),
            embedding,
            document_id: "doc".into(),
            source: "doc.txt".into(),
            page: 1,
            index: 0,
            start: 0,
        }
    }

    #[tokio::test]
    async fn empty_store_has_no_entries() {
        let store = InMemoryVectorStore::new();
        assert!(!store.has_entries().await.unwrap());
        assert!(store.search(&[1.0, 0.0], 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_orders_by_similarity() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[chunk("a", vec![0.0, 1.0]), chunk("b", vec![1.0, 0.0]), chunk("c", vec![1.0, 1.0])])
            .await
            .unwrap();
        let results = store.search(&[1.0, 0.1], 2).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[chunk("first", vec![1.0, 0.0]), chunk("second", vec![2.0, 0.0])])
            .await
            .unwrap();
        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].chunk.id, "first");
        assert_eq!(results[1].chunk.id, "second");
    }

    #[tokio::test]
    async fn duplicates_are_kept_by_default() {
        let store = InMemoryVectorStore::new();
        let chunks = [chunk("a", vec![1.0])];
        store.upsert(&chunks).await.unwrap();
        store.upsert(&chunks).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn deduplication_replaces_in_place() {
        let store = InMemoryVectorStore::new().with_deduplication(true);
        store.upsert(&[chunk("a", vec![1.0]), chunk("b", vec![0.5])]).await.unwrap();
        let mut updated = chunk("a", vec![2.0]);
        updated.text = "updated".into();
        store.upsert(&[updated]).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 2);
        let results = store.search(&[1.0], 2).await.unwrap();
        assert_eq!(results[0].chunk.text, "updated");
    }

    #[tokio::test]
    async fn rejects_chunks_without_embeddings() {
        let store = InMemoryVectorStore::new();
        let result = store.upsert(&[chunk("a", Vec::new())]).await;
        assert!(matches!(result, Err(RagError::VectorStoreError { .. })));
        assert!(!store.has_entries().await.unwrap());
    }
}
