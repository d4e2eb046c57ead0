//! Vector store abstraction for the knowledge base.
//!
//! Provides a trait-based interface for different vector database backends.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::document::Document;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A document stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Unique row ID.
    pub id: Uuid,
    /// Source name (URL or file stem).
    pub name: String,
    /// Text content of this chunk.
    pub content: String,
    /// Metadata carried over from the reader.
    pub meta_data: Map<String, Value>,
    /// SHA-256 of name and content; identifies the chunk for upserts.
    pub content_hash: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this document was stored.
    pub created_at: DateTime<Utc>,
}

impl StoredDocument {
    /// Create a stored document from a reader document and its embedding.
    pub fn new(document: Document, embedding: Vec<f32>) -> Self {
        let content_hash = content_hash(&document.name, &document.content);
        Self {
            id: Uuid::new_v4(),
            name: document.name,
            content: document.content,
            meta_data: document.meta_data,
            content_hash,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// Hash identifying a chunk of a source.
pub fn content_hash(name: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched document.
    pub document: StoredDocument,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about an indexed source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    /// Source name.
    pub name: String,
    /// Number of stored chunks.
    pub chunk_count: u32,
    /// Most recent time a chunk of this source was stored.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert a document, replacing any document with the same content hash.
    async fn upsert(&self, doc: &StoredDocument) -> Result<()>;

    /// Bulk upsert documents.
    async fn upsert_batch(&self, docs: &[StoredDocument]) -> Result<usize>;

    /// Bulk insert documents, skipping content hashes already present.
    /// Returns how many were inserted.
    async fn insert_batch(&self, docs: &[StoredDocument]) -> Result<usize>;

    /// Search for similar documents.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Search with a minimum similarity threshold.
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Check whether a content hash is stored.
    async fn doc_exists(&self, content_hash: &str) -> Result<bool>;

    /// Check whether any chunk of a source is stored.
    async fn name_exists(&self, name: &str) -> Result<bool>;

    /// Delete all chunks of a source.
    async fn delete_by_name(&self, name: &str) -> Result<usize>;

    /// List all indexed sources, most recent first.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Get total document count.
    async fn count(&self) -> Result<usize>;

    /// Remove every document. Returns how many were removed.
    async fn clear(&self) -> Result<usize>;
}

/// Cosine similarity of two embeddings; 0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (dot, len_a, len_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, la, lb), (x, y)| {
            (dot + x * y, la + x * x, lb + y * y)
        });
    let norm = len_a.sqrt() * len_b.sqrt();
    if norm == 0.0 {
        0.0
    } else {
        dot / norm
    }
}

/// Score, filter and rank candidates against a query embedding.
pub(crate) fn rank(
    candidates: impl IntoIterator<Item = StoredDocument>,
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .map(|doc| {
            let score = cosine_similarity(query_embedding, &doc.embedding);
            SearchResult { document: doc, score }
        })
        .filter(|r| r.score >= min_score)
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_content_hash_depends_on_name_and_content() {
        let h1 = content_hash("a", "text");
        assert_eq!(h1, content_hash("a", "text"));
        assert_ne!(h1, content_hash("b", "text"));
        assert_ne!(h1, content_hash("a", "other"));
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_rank_orders_and_filters() {
        let docs = vec![
            StoredDocument::new(Document::new("x", "one"), vec![0.0, 1.0]),
            StoredDocument::new(Document::new("x", "two"), vec![1.0, 0.0]),
            StoredDocument::new(Document::new("x", "three"), vec![1.0, 1.0]),
        ];

        let results = rank(docs, &[1.0, 0.0], 5, 0.5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.content, "two");
        assert_eq!(results[1].document.content, "three");
    }
}
