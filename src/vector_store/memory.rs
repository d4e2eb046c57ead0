//! In-memory vector store implementation.
//!
//! Useful for testing and throwaway sessions.

use super::{rank, IndexedSource, SearchResult, StoredDocument, VectorStore};
use crate::error::{LlmOsError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store keyed by content hash.
pub struct MemoryVectorStore {
    documents: RwLock<HashMap<String, StoredDocument>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StoredDocument>>> {
        self.documents
            .read()
            .map_err(|e| LlmOsError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, StoredDocument>>> {
        self.documents
            .write()
            .map_err(|e| LlmOsError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, doc: &StoredDocument) -> Result<()> {
        self.write()?.insert(doc.content_hash.clone(), doc.clone());
        Ok(())
    }

    async fn upsert_batch(&self, docs: &[StoredDocument]) -> Result<usize> {
        let mut store = self.write()?;
        for doc in docs {
            store.insert(doc.content_hash.clone(), doc.clone());
        }
        Ok(docs.len())
    }

    async fn insert_batch(&self, docs: &[StoredDocument]) -> Result<usize> {
        let mut store = self.write()?;
        let mut inserted = 0;
        for doc in docs {
            if !store.contains_key(&doc.content_hash) {
                store.insert(doc.content_hash.clone(), doc.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, f32::MIN).await
    }

    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let docs = self.read()?;
        Ok(rank(docs.values().cloned(), query_embedding, limit, min_score))
    }

    async fn doc_exists(&self, content_hash: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(content_hash))
    }

    async fn name_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.values().any(|d| d.name == name))
    }

    async fn delete_by_name(&self, name: &str) -> Result<usize> {
        let mut docs = self.write()?;
        let initial_len = docs.len();
        docs.retain(|_, doc| doc.name != name);
        Ok(initial_len - docs.len())
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let docs = self.read()?;
        let mut sources: HashMap<String, IndexedSource> = HashMap::new();

        for doc in docs.values() {
            let entry = sources
                .entry(doc.name.clone())
                .or_insert_with(|| IndexedSource {
                    name: doc.name.clone(),
                    chunk_count: 0,
                    indexed_at: doc.created_at,
                });
            entry.chunk_count += 1;
            if doc.created_at > entry.indexed_at {
                entry.indexed_at = doc.created_at;
            }
        }

        let mut sources: Vec<IndexedSource> = sources.into_values().collect();
        sources.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(sources)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn clear(&self) -> Result<usize> {
        let mut docs = self.write()?;
        let removed = docs.len();
        docs.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let doc1 = StoredDocument::new(Document::new("page", "Hello world"), vec![1.0, 0.0, 0.0]);
        let doc2 = StoredDocument::new(Document::new("page", "Goodbye world"), vec![0.0, 1.0, 0.0]);

        store.upsert_batch(&[doc1.clone(), doc2]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);

        // Same content again is not duplicated
        let again = StoredDocument::new(Document::new("page", "Hello world"), vec![1.0, 0.0, 0.0]);
        assert_eq!(store.insert_batch(&[again]).await.unwrap(), 0);
        assert!(store.doc_exists(&doc1.content_hash).await.unwrap());

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunk_count, 2);

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(!store.name_exists("page").await.unwrap());
    }
}
