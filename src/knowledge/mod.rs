//! Knowledge base for retrieval-augmented answers.
//!
//! Combines an [`Embedder`] with a [`VectorStore`] so documents produced by the
//! readers can be loaded and searched by natural-language queries.

use crate::document::Document;
use crate::embedding::Embedder;
use crate::error::{LlmOsError, Result};
use crate::vector_store::{IndexedSource, SearchResult, StoredDocument, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default number of documents returned by a search.
pub const DEFAULT_NUM_DOCUMENTS: usize = 3;

/// Searchable document collection used by an assistant.
pub struct AssistantKnowledge {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    num_documents: usize,
    min_score: f32,
}

impl AssistantKnowledge {
    /// Create a knowledge base over a vector store.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            num_documents: DEFAULT_NUM_DOCUMENTS,
            min_score: 0.0,
        }
    }

    /// Set the number of documents returned by [`search`](Self::search).
    pub fn with_num_documents(mut self, num_documents: usize) -> Self {
        self.num_documents = num_documents.max(1);
        self
    }

    /// Set the minimum similarity for a search hit.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn num_documents(&self) -> usize {
        self.num_documents
    }

    /// Embed and store documents.
    ///
    /// With `upsert`, documents replace stored ones with the same content hash;
    /// otherwise already-present documents are skipped. Returns the number of
    /// documents written.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn load_documents(&self, documents: Vec<Document>, upsert: bool) -> Result<usize> {
        let documents: Vec<Document> = documents
            .into_iter()
            .filter(|d| !d.content.trim().is_empty())
            .collect();
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(LlmOsError::Knowledge(format!(
                "Embedded {} of {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        let stored: Vec<StoredDocument> = documents
            .into_iter()
            .zip(embeddings)
            .map(|(doc, embedding)| StoredDocument::new(doc, embedding))
            .collect();

        let written = if upsert {
            self.vector_store.upsert_batch(&stored).await?
        } else {
            self.vector_store.insert_batch(&stored).await?
        };

        info!("Loaded {} documents into the knowledge base", written);
        Ok(written)
    }

    /// Return the documents most relevant to `query`.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_top(query, self.num_documents).await
    }

    /// Like [`search`](Self::search) with an explicit result count.
    #[instrument(skip(self))]
    pub async fn search_top(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self
            .vector_store
            .search_with_threshold(&query_embedding, limit.max(1), self.min_score)
            .await?;
        debug!("Knowledge search returned {} documents", results.len());
        Ok(results)
    }

    /// True when at least one document is stored.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.vector_store.count().await? > 0)
    }

    /// True when a source with this name has been loaded.
    pub async fn contains_source(&self, name: &str) -> Result<bool> {
        self.vector_store.name_exists(name).await
    }

    pub async fn sources(&self) -> Result<Vec<IndexedSource>> {
        self.vector_store.list_sources().await
    }

    /// Remove every document. Returns the number removed.
    pub async fn clear(&self) -> Result<usize> {
        self.vector_store.clear().await
    }
}

/// Render search results as the JSON list handed to the model.
pub fn format_references(results: &[SearchResult]) -> String {
    let references: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.document.name,
                "meta_data": r.document.meta_data,
                "content": r.document.content,
            })
        })
        .collect();

    serde_json::to_string_pretty(&references).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::KeywordEmbedder;
    use crate::vector_store::MemoryVectorStore;

    fn knowledge() -> AssistantKnowledge {
        AssistantKnowledge::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(KeywordEmbedder::new(&["rust", "python", "stock"])),
        )
    }

    fn docs() -> Vec<Document> {
        vec![
            Document::new("lang", "Rust is a systems language. Rust is fast."),
            Document::new("lang", "Python is a scripting language."),
            Document::new("market", "The stock price went up."),
        ]
    }

    #[tokio::test]
    async fn test_load_and_search() {
        let kb = knowledge().with_num_documents(1);
        assert!(!kb.exists().await.unwrap());

        assert_eq!(kb.load_documents(docs(), true).await.unwrap(), 3);
        assert!(kb.exists().await.unwrap());
        assert!(kb.contains_source("market").await.unwrap());

        let results = kb.search("tell me about python").await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].document.content.starts_with("Python"));
    }

    #[tokio::test]
    async fn test_load_without_upsert_skips_existing() {
        let kb = knowledge();
        assert_eq!(kb.load_documents(docs(), false).await.unwrap(), 3);
        assert_eq!(kb.load_documents(docs(), false).await.unwrap(), 0);

        let extra = vec![Document::new("lang", "Go is also a language."), Document::new("x", "  ")];
        assert_eq!(kb.load_documents(extra, false).await.unwrap(), 1);
        assert_eq!(kb.sources().await.unwrap().len(), 2);

        assert_eq!(kb.clear().await.unwrap(), 4);
        assert!(!kb.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_format_references() {
        let kb = knowledge();
        kb.load_documents(docs(), true).await.unwrap();
        let results = kb.search("stock").await.unwrap();

        let rendered = format_references(&results[..1]);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed[0]["name"], "market");
        assert_eq!(parsed[0]["content"], "The stock price went up.");
        assert_eq!(format_references(&[]), "[]");
    }
}
