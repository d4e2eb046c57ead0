//! SQLite-backed run storage.

use super::{AssistantRun, AssistantStorage};
use crate::error::{LlmOsError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const RUN_COLUMNS: &str =
    "run_id, user_id, name, run_name, llm, memory, assistant_data, created_at, updated_at";

/// Stores runs in a single SQLite table.
pub struct SqliteAssistantStorage {
    conn: Mutex<Connection>,
    table_name: String,
}

impl SqliteAssistantStorage {
    /// Open (or create) run storage in the database at `path`.
    #[instrument(skip_all, fields(table = %table_name))]
    pub fn new(path: &Path, table_name: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LlmOsError::Storage(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            LlmOsError::Storage(format!("Cannot open database {}: {}", path.display(), e))
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let storage = Self::with_connection(conn, table_name)?;
        info!("Opened run storage at {:?}", path);
        Ok(storage)
    }

    /// In-memory storage (useful for testing).
    pub fn in_memory(table_name: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table_name)
    }

    fn with_connection(conn: Connection, table_name: &str) -> Result<Self> {
        if table_name.is_empty()
            || !table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(LlmOsError::Config(format!(
                "Invalid storage table name '{}'",
                table_name
            )));
        }

        let storage = Self {
            conn: Mutex::new(conn),
            table_name: table_name.to_string(),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LlmOsError::Storage(format!("Failed to acquire lock: {}", e)))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                run_id TEXT PRIMARY KEY,
                user_id TEXT,
                name TEXT,
                run_name TEXT,
                llm TEXT NOT NULL DEFAULT 'null',
                memory TEXT NOT NULL DEFAULT '{{}}',
                assistant_data TEXT NOT NULL DEFAULT 'null',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_user ON {table}(user_id);
            "#,
            table = self.table_name
        ))?;
        Ok(())
    }

    fn query_runs(&self, user_id: Option<&str>) -> Result<Vec<AssistantRun>> {
        let conn = self.lock()?;
        let runs = match user_id {
            Some(user_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RUN_COLUMNS} FROM {} WHERE user_id = ?1 ORDER BY created_at DESC",
                    self.table_name
                ))?;
                let rows = stmt.query_map(params![user_id], RunRow::from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RUN_COLUMNS} FROM {} ORDER BY created_at DESC",
                    self.table_name
                ))?;
                let rows = stmt.query_map([], RunRow::from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        runs.into_iter().map(RunRow::into_run).collect()
    }
}

/// A stored row before its JSON columns are decoded.
struct RunRow {
    run_id: String,
    user_id: Option<String>,
    name: Option<String>,
    run_name: Option<String>,
    llm: String,
    memory: String,
    assistant_data: String,
    created_at: String,
    updated_at: String,
}

impl RunRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            run_id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            run_name: row.get(3)?,
            llm: row.get(4)?,
            memory: row.get(5)?,
            assistant_data: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    /// Undecodable columns are an error: a run loaded with empty memory
    /// would overwrite its history on the next upsert.
    fn into_run(self) -> Result<AssistantRun> {
        Ok(AssistantRun {
            llm: decode_column(&self.run_id, "llm", &self.llm)?,
            memory: decode_column(&self.run_id, "memory", &self.memory)?,
            assistant_data: decode_column(&self.run_id, "assistant_data", &self.assistant_data)?,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
            user_id: self.user_id,
            name: self.name,
            run_name: self.run_name,
            run_id: self.run_id,
        })
    }
}

fn decode_column<T: DeserializeOwned>(run_id: &str, column: &str, value: &str) -> Result<T> {
    serde_json::from_str(value).map_err(|e| {
        LlmOsError::Storage(format!("Run {} has an invalid {} column: {}", run_id, column, e))
    })
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl AssistantStorage for SqliteAssistantStorage {
    async fn create(&self) -> Result<()> {
        self.init_schema()
    }

    #[instrument(skip(self))]
    async fn read(&self, run_id: &str) -> Result<Option<AssistantRun>> {
        let conn = self.lock()?;
        let run = conn
            .query_row(
                &format!(
                    "SELECT {RUN_COLUMNS} FROM {} WHERE run_id = ?1",
                    self.table_name
                ),
                params![run_id],
                RunRow::from_row,
            )
            .optional()?;
        run.map(RunRow::into_run).transpose()
    }

    #[instrument(skip(self, run), fields(run_id = %run.run_id))]
    async fn upsert(&self, run: &AssistantRun) -> Result<AssistantRun> {
        let mut stored = run.clone();
        stored.updated_at = Utc::now();

        {
            let conn = self.lock()?;
            conn.execute(
                &format!(
                    r#"
                    INSERT INTO {} ({RUN_COLUMNS})
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(run_id) DO UPDATE SET
                        user_id = excluded.user_id,
                        name = excluded.name,
                        run_name = excluded.run_name,
                        llm = excluded.llm,
                        memory = excluded.memory,
                        assistant_data = excluded.assistant_data,
                        updated_at = excluded.updated_at
                    "#,
                    self.table_name
                ),
                params![
                    stored.run_id,
                    stored.user_id,
                    stored.name,
                    stored.run_name,
                    serde_json::to_string(&stored.llm)?,
                    serde_json::to_string(&stored.memory)?,
                    serde_json::to_string(&stored.assistant_data)?,
                    stored.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                    stored.updated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )?;
        }

        debug!("Stored run {}", stored.run_id);
        Ok(stored)
    }

    async fn get_all_run_ids(&self, user_id: Option<&str>) -> Result<Vec<String>> {
        Ok(self
            .query_runs(user_id)?
            .into_iter()
            .map(|r| r.run_id)
            .collect())
    }

    async fn get_all_runs(&self, user_id: Option<&str>) -> Result<Vec<AssistantRun>> {
        self.query_runs(user_id)
    }

    #[instrument(skip(self))]
    async fn delete(&self, run_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE run_id = ?1", self.table_name),
            params![run_id],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::Message;
    use chrono::Duration;

    #[tokio::test]
    async fn test_upsert_and_read_run() {
        let storage = SqliteAssistantStorage::in_memory("llm_os_storage").unwrap();
        storage.create().await.unwrap();

        let mut run = AssistantRun::new("run-1", Some("ada".to_string()));
        run.name = Some("LLM OS".to_string());
        run.memory.add_chat_message(Message::user("hello"));
        run.llm = serde_json::json!({"model": "gpt-4o"});
        storage.upsert(&run).await.unwrap();

        let loaded = storage.read("run-1").await.unwrap().unwrap();
        assert_eq!(loaded.user_id.as_deref(), Some("ada"));
        assert_eq!(loaded.memory.chat_history[0].content, "hello");
        assert_eq!(loaded.llm["model"], "gpt-4o");

        run.memory.add_chat_message(Message::assistant("hi"));
        storage.upsert(&run).await.unwrap();
        let loaded = storage.read("run-1").await.unwrap().unwrap();
        assert_eq!(loaded.memory.chat_history.len(), 2);

        assert!(storage.read("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_ids_newest_first_per_user() {
        let storage = SqliteAssistantStorage::in_memory("runs").unwrap();

        let mut older = AssistantRun::new("older", Some("ada".to_string()));
        older.created_at = Utc::now() - Duration::hours(1);
        let newer = AssistantRun::new("newer", Some("ada".to_string()));
        let other = AssistantRun::new("other", Some("bob".to_string()));

        for run in [&older, &newer, &other] {
            storage.upsert(run).await.unwrap();
        }

        assert_eq!(
            storage.get_all_run_ids(Some("ada")).await.unwrap(),
            vec!["newer", "older"]
        );
        assert_eq!(storage.get_all_run_ids(None).await.unwrap().len(), 3);
        assert_eq!(storage.get_all_runs(Some("bob")).await.unwrap()[0].run_id, "other");

        assert!(storage.delete("other").await.unwrap());
        assert!(!storage.delete("other").await.unwrap());
    }

    #[test]
    fn test_rejects_invalid_table_name() {
        assert!(SqliteAssistantStorage::in_memory("runs;--").is_err());
    }

    #[tokio::test]
    async fn test_corrupt_memory_is_an_error() {
        let storage = SqliteAssistantStorage::in_memory("llm_os_storage").unwrap();
        storage
            .upsert(&AssistantRun::new("run-1", Some("ada".to_string())))
            .await
            .unwrap();
        storage
            .lock()
            .unwrap()
            .execute(
                "UPDATE llm_os_storage SET memory = 'not json' WHERE run_id = 'run-1'",
                [],
            )
            .unwrap();

        let err = storage.read("run-1").await.unwrap_err();
        assert!(matches!(err, LlmOsError::Storage(ref m) if m.contains("memory")));
        assert!(storage.get_all_runs(Some("ada")).await.is_err());
    }
}
