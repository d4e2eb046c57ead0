//! Configuration module for llmos.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts, PythonPrompts, ResearchPrompts};
pub use settings::{
    EmbeddingSettings, ExaSettings, GeneralSettings, KnowledgeSettings, LlmSettings,
    PromptSettings, ReaderSettings, ServerSettings, Settings, StorageSettings, TeamSettings,
    ToolSettings,
};
