//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Each collection lives in its own table.

use super::{rank, IndexedSource, SearchResult, StoredDocument, VectorStore};
use crate::error::{LlmOsError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteVectorStore {
    /// Open (or create) a collection in the database at `path`.
    #[instrument(skip_all, fields(collection = %collection))]
    pub fn new(path: &Path, collection: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self::with_connection(conn, collection)?;
        info!("Initialized SQLite vector store at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory collection (useful for testing).
    pub fn in_memory(collection: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, collection)
    }

    fn with_connection(conn: Connection, collection: &str) -> Result<Self> {
        let table = validate_identifier(collection)?;

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                meta_data TEXT NOT NULL,
                content_hash TEXT NOT NULL UNIQUE,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_name ON {table}(name);
            "#
        ))?;

        Ok(Self {
            conn: Mutex::new(conn),
            table,
        })
    }

    /// Collection (table) name.
    pub fn collection(&self) -> &str {
        &self.table
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LlmOsError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_document(row: &Row<'_>) -> rusqlite::Result<StoredDocument> {
        let id_str: String = row.get(0)?;
        let meta_str: String = row.get(3)?;
        let embedding_bytes: Vec<u8> = row.get(5)?;
        let created_at_str: String = row.get(6)?;

        Ok(StoredDocument {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            name: row.get(1)?,
            content: row.get(2)?,
            meta_data: serde_json::from_str(&meta_str).unwrap_or_default(),
            content_hash: row.get(4)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            created_at: parse_timestamp(&created_at_str),
        })
    }

    fn write_documents(&self, docs: &[StoredDocument], replace: bool) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let sql = if replace {
            format!(
                r#"
                INSERT INTO {} (id, name, content, meta_data, content_hash, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(content_hash) DO UPDATE SET
                    name = excluded.name,
                    content = excluded.content,
                    meta_data = excluded.meta_data,
                    embedding = excluded.embedding,
                    created_at = excluded.created_at
                "#,
                self.table
            )
        } else {
            format!(
                r#"
                INSERT OR IGNORE INTO {} (id, name, content, meta_data, content_hash, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                self.table
            )
        };

        let mut written = 0;
        for doc in docs {
            written += tx.execute(
                &sql,
                params![
                    doc.id.to_string(),
                    doc.name,
                    doc.content,
                    serde_json::to_string(&doc.meta_data)?,
                    doc.content_hash,
                    Self::embedding_to_bytes(&doc.embedding),
                    doc.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )?;
        }

        tx.commit()?;
        Ok(written)
    }
}

/// Table names are interpolated into SQL, so only plain identifiers are accepted.
fn validate_identifier(name: &str) -> Result<String> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());

    if valid {
        Ok(name.to_string())
    } else {
        Err(LlmOsError::Config(format!(
            "Invalid table name '{}': use letters, digits and underscores",
            name
        )))
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, doc))]
    async fn upsert(&self, doc: &StoredDocument) -> Result<()> {
        self.write_documents(std::slice::from_ref(doc), true)?;
        debug!("Upserted document {}", doc.id);
        Ok(())
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn upsert_batch(&self, docs: &[StoredDocument]) -> Result<usize> {
        let written = self.write_documents(docs, true)?;
        info!("Batch upserted {} documents", written);
        Ok(written)
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn insert_batch(&self, docs: &[StoredDocument]) -> Result<usize> {
        let written = self.write_documents(docs, false)?;
        info!("Inserted {} new documents", written);
        Ok(written)
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, f32::MIN).await
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT id, name, content, meta_data, content_hash, embedding, created_at FROM {}",
            self.table
        ))?;

        let docs: Vec<StoredDocument> = stmt
            .query_map([], Self::row_to_document)?
            .filter_map(|d| d.ok())
            .collect();

        let results = rank(docs, query_embedding, limit, min_score);
        debug!("Found {} matching documents", results.len());
        Ok(results)
    }

    async fn doc_exists(&self, content_hash: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE content_hash = ?1", self.table),
            params![content_hash],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn name_exists(&self, name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE name = ?1", self.table),
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn delete_by_name(&self, name: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE name = ?1", self.table),
            params![name],
        )?;
        info!("Deleted {} documents for {}", deleted, name);
        Ok(deleted)
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT name, COUNT(*) AS chunk_count, MAX(created_at) AS indexed_at
            FROM {}
            GROUP BY name
            ORDER BY indexed_at DESC
            "#,
            self.table
        ))?;

        let sources = stmt
            .query_map([], |row| {
                let indexed_at: String = row.get(2)?;
                Ok(IndexedSource {
                    name: row.get(0)?,
                    chunk_count: row.get(1)?,
                    indexed_at: parse_timestamp(&indexed_at),
                })
            })?
            .filter_map(|s| s.ok())
            .collect();

        Ok(sources)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(&format!("DELETE FROM {}", self.table), [])?;
        info!("Cleared {} documents from {}", removed, self.table);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn doc(name: &str, content: &str, embedding: Vec<f32>) -> StoredDocument {
        StoredDocument::new(
            Document::new(name, content).with_meta("chunk", 1),
            embedding,
        )
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory("llm_os_documents").unwrap();

        store
            .upsert(&doc("https://example.com", "This is test content", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "https://example.com");

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].document.meta_data["chunk"], 1);

        let deleted = store.delete_by_name("https://example.com").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.list_sources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_skips_existing_and_upsert_replaces() {
        let store = SqliteVectorStore::in_memory("docs").unwrap();

        let first = doc("report", "page one", vec![1.0, 0.0]);
        assert_eq!(store.insert_batch(&[first.clone()]).await.unwrap(), 1);

        let duplicate = doc("report", "page one", vec![0.0, 1.0]);
        assert_eq!(store.insert_batch(&[duplicate.clone()]).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 1);

        // Upsert overwrites the embedding of the matching hash
        store.upsert_batch(&[duplicate]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let results = store.search(&[0.0, 1.0], 1).await.unwrap();
        assert!((results[0].score - 1.0).abs() < 0.001);

        assert!(store.doc_exists(&first.content_hash).await.unwrap());
        assert_eq!(store.clear().await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_rejects_unsafe_collection_names() {
        assert!(SqliteVectorStore::in_memory("docs; DROP TABLE x").is_err());
        assert!(SqliteVectorStore::in_memory("1docs").is_err());
        assert!(SqliteVectorStore::in_memory("").is_err());
    }

    #[test]
    fn test_embedding_bytes_round_trip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let bytes = SqliteVectorStore::embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(SqliteVectorStore::bytes_to_embedding(&bytes), embedding);
    }
}
