//! Configuration settings for llmos.

use crate::assistant::AssistantOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub storage: StorageSettings,
    pub knowledge: KnowledgeSettings,
    pub tools: ToolSettings,
    pub team: TeamSettings,
    pub exa: ExaSettings,
    pub reader: ReaderSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Working directory exposed to the file tools. Holds the `scratch` directory.
    pub workspace_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.llmos".to_string(),
            workspace_dir: "~/.llmos/workspace".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Chat model settings shared by the assistant and its team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Model identifier.
    pub model: String,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// OpenAI-compatible base URL. None uses the provider default.
    pub api_base: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            api_base: None,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Run storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path to the SQLite database holding runs and the knowledge base.
    pub sqlite_path: String,
    /// Table that stores assistant runs.
    pub table_name: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.llmos/llmos.db".to_string(),
            table_name: "llm_os_storage".to_string(),
        }
    }
}

/// Knowledge base settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    /// Vector store collection name.
    pub collection: String,
    /// Number of references returned per knowledge search.
    pub num_documents: usize,
    /// Minimum similarity score for a reference to be returned.
    pub min_score: f32,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            collection: "llm_os_documents".to_string(),
            num_documents: 3,
            min_score: 0.0,
        }
    }
}

/// Which toolkits are enabled when a session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub calculator: bool,
    pub ddg_search: bool,
    pub file_tools: bool,
    pub finance_tools: bool,
    /// Fixed number of web search results handed to the model.
    pub ddg_max_results: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            calculator: true,
            ddg_search: true,
            file_tools: true,
            finance_tools: true,
            ddg_max_results: 3,
        }
    }
}

/// Which team members are enabled when a session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamSettings {
    pub python_assistant: bool,
    pub research_assistant: bool,
}

impl Default for TeamSettings {
    fn default() -> Self {
        Self {
            python_assistant: false,
            research_assistant: true,
        }
    }
}

/// Exa search settings used by the research assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExaSettings {
    /// Results per search. When set it overrides the count the model asks for.
    pub num_results: Option<usize>,
    /// Characters of page text kept per result.
    pub text_length_limit: usize,
}

impl Default for ExaSettings {
    fn default() -> Self {
        Self {
            num_results: Some(5),
            text_length_limit: 1000,
        }
    }
}

/// Website reader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// Maximum number of links followed from a page.
    pub max_links: usize,
    /// Maximum crawl depth (1 = start page only).
    pub max_depth: usize,
    /// Maximum characters per knowledge document.
    pub chunk_size: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            max_links: 2,
            max_depth: 1,
            chunk_size: 5000,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from `path`, or the default location. A missing file
    /// yields the defaults.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = path.cloned().unwrap_or_else(Self::default_config_path);
        match std::fs::read_to_string(&config_path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write settings as TOML, creating parent directories.
    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LlmOsError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("llmos")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded workspace directory path.
    pub fn workspace_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.workspace_dir)
    }

    /// Scratch directory inside the workspace, created if missing.
    pub fn scratch_dir(&self) -> crate::error::Result<PathBuf> {
        let dir = self.workspace_dir().join("scratch");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.storage.sqlite_path)
    }

    /// Assistant flags derived from the `tools` and `team` sections.
    pub fn assistant_options(&self) -> AssistantOptions {
        AssistantOptions {
            calculator: self.tools.calculator,
            ddg_search: self.tools.ddg_search,
            file_tools: self.tools.file_tools,
            finance_tools: self.tools.finance_tools,
            python_assistant: self.team.python_assistant,
            research_assistant: self.team.research_assistant,
            ..AssistantOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [llm]
            model = "claude-3-5-sonnet"

            [tools]
            finance_tools = false
            "#,
        )
        .unwrap();

        assert_eq!(settings.llm.model, "claude-3-5-sonnet");
        assert_eq!(settings.llm.max_tokens, 1024);
        assert!(!settings.tools.finance_tools);
        assert!(settings.tools.calculator);
        assert_eq!(settings.storage.table_name, "llm_os_storage");
        assert_eq!(settings.knowledge.num_documents, 3);
    }

    #[test]
    fn test_assistant_options_follow_sections() {
        let mut settings = Settings::default();
        settings.tools.ddg_search = false;
        settings.team.python_assistant = true;

        let options = settings.assistant_options();
        assert!(options.calculator);
        assert!(!options.ddg_search);
        assert!(options.python_assistant);
        assert!(options.research_assistant);
        assert!(options.run_id.is_none());
    }

    #[test]
    fn test_scratch_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.workspace_dir = dir.path().to_string_lossy().to_string();

        let scratch = settings.scratch_dir().unwrap();
        assert!(scratch.exists());
        assert!(scratch.ends_with("scratch"));
    }

    #[test]
    fn test_save_and_load_round_trip_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.server.port = 9100;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 9100);
    }
}
