//! Persistent storage for assistant runs.
//!
//! A run is one conversation: its id, owner, memory and assistant metadata.

mod sqlite;

pub use sqlite::SqliteAssistantStorage;

use crate::assistant::AssistantMemory;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default table holding runs.
pub const DEFAULT_TABLE_NAME: &str = "llm_os_storage";

/// A persisted assistant run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantRun {
    pub run_id: String,
    pub user_id: Option<String>,
    /// Name of the assistant that owns the run.
    pub name: Option<String>,
    pub run_name: Option<String>,
    /// Model settings in effect for the run.
    #[serde(default)]
    pub llm: Value,
    #[serde(default)]
    pub memory: AssistantMemory,
    /// Free-form assistant metadata (enabled tools, team...).
    #[serde(default)]
    pub assistant_data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssistantRun {
    /// A new, empty run.
    pub fn new(run_id: impl Into<String>, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            user_id,
            name: None,
            run_name: None,
            llm: Value::Null,
            memory: AssistantMemory::default(),
            assistant_data: Value::Null,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trait for run storage backends.
#[async_trait]
pub trait AssistantStorage: Send + Sync {
    /// Ensure the backing schema exists.
    async fn create(&self) -> Result<()>;

    /// Load a run by id.
    async fn read(&self, run_id: &str) -> Result<Option<AssistantRun>>;

    /// Insert or replace a run; returns the stored version.
    async fn upsert(&self, run: &AssistantRun) -> Result<AssistantRun>;

    /// Run ids, newest first, optionally restricted to one user.
    async fn get_all_run_ids(&self, user_id: Option<&str>) -> Result<Vec<String>>;

    /// Runs, newest first, optionally restricted to one user.
    async fn get_all_runs(&self, user_id: Option<&str>) -> Result<Vec<AssistantRun>>;

    /// Delete a run. Returns whether it existed.
    async fn delete(&self, run_id: &str) -> Result<bool>;
}
