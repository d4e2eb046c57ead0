//! Service wiring for llmos.
//!
//! Builds the chat model, knowledge base and run storage from settings and
//! hands them to every assistant it creates.

use crate::assistant::{build_llm_os, Assistant, AssistantDeps, AssistantOptions, ChatModel, OpenAIChatModel};
use crate::config::{Prompts, Settings};
use crate::document::{Document, PdfReader, WebsiteReader};
use crate::embedding::OpenAIEmbedder;
use crate::error::Result;
use crate::knowledge::AssistantKnowledge;
use crate::storage::{AssistantStorage, SqliteAssistantStorage};
use crate::vector_store::SqliteVectorStore;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Owns the shared services behind every assistant.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    llm: Arc<dyn ChatModel>,
    knowledge: Arc<AssistantKnowledge>,
    storage: Arc<dyn AssistantStorage>,
}

/// Outcome of loading a source into the knowledge base.
#[derive(Debug, Clone)]
pub struct IngestResult {
    /// Source name documents are stored under.
    pub name: String,
    /// Documents produced by the reader.
    pub documents_read: usize,
    /// Documents newly written to the knowledge base.
    pub documents_loaded: usize,
}

impl IngestResult {
    /// True when the reader produced nothing.
    pub fn is_empty(&self) -> bool {
        self.documents_read == 0
    }
}

impl Orchestrator {
    /// Create an orchestrator from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let llm: Arc<dyn ChatModel> = Arc::new(OpenAIChatModel::new(&settings.llm));
        let embedder = Arc::new(OpenAIEmbedder::from(&settings.embedding));

        let db_path = settings.sqlite_path();
        let vector_store = Arc::new(SqliteVectorStore::new(&db_path, &settings.knowledge.collection)?);
        let knowledge = Arc::new(
            AssistantKnowledge::new(vector_store, embedder)
                .with_num_documents(settings.knowledge.num_documents)
                .with_min_score(settings.knowledge.min_score),
        );
        let storage: Arc<dyn AssistantStorage> =
            Arc::new(SqliteAssistantStorage::new(&db_path, &settings.storage.table_name)?);

        info!("Using model {} with database {:?}", settings.llm.model, db_path);

        Ok(Self {
            settings,
            prompts,
            llm,
            knowledge,
            storage,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        llm: Arc<dyn ChatModel>,
        knowledge: Arc<AssistantKnowledge>,
        storage: Arc<dyn AssistantStorage>,
    ) -> Self {
        Self {
            settings,
            prompts,
            llm,
            knowledge,
            storage,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    pub fn knowledge(&self) -> Arc<AssistantKnowledge> {
        self.knowledge.clone()
    }

    pub fn storage(&self) -> Arc<dyn AssistantStorage> {
        self.storage.clone()
    }

    /// Services handed to assistants.
    pub fn deps(&self) -> AssistantDeps {
        AssistantDeps {
            llm: self.llm.clone(),
            storage: Some(self.storage.clone()),
            knowledge: Some(self.knowledge.clone()),
        }
    }

    /// Build the LLM OS assistant for the given flags.
    pub fn build_llm_os(&self, options: &AssistantOptions) -> Result<Assistant> {
        build_llm_os(options, &self.settings, &self.prompts, &self.deps())
    }

    /// Read a website and load it into the knowledge base.
    #[instrument(skip(self))]
    pub async fn add_url(&self, url: &str) -> Result<IngestResult> {
        let reader = WebsiteReader::new(self.settings.reader.max_links, self.settings.reader.max_depth)
            .with_chunk_size(self.settings.reader.chunk_size);
        let documents = reader.read(url).await?;
        self.ingest(url.to_string(), documents).await
    }

    /// Read a PDF file and load it into the knowledge base.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn add_pdf(&self, path: &Path) -> Result<IngestResult> {
        let documents = PdfReader::new().read(path).await?;
        self.ingest(PdfReader::source_name(path), documents).await
    }

    async fn ingest(&self, name: String, documents: Vec<Document>) -> Result<IngestResult> {
        let documents_read = documents.len();
        let documents_loaded = if documents.is_empty() {
            0
        } else {
            self.knowledge.load_documents(documents, true).await?
        };

        info!("Loaded {} of {} documents from {}", documents_loaded, documents_read, name);
        Ok(IngestResult {
            name,
            documents_read,
            documents_loaded,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::assistant::testing::ScriptedModel;
    use crate::assistant::ModelReply;
    use crate::embedding::testing::KeywordEmbedder;
    use crate::vector_store::MemoryVectorStore;

    /// Orchestrator over in-memory services and a scripted model.
    pub fn orchestrator(workspace: &Path, replies: Vec<ModelReply>) -> Orchestrator {
        let storage: Arc<dyn AssistantStorage> =
            Arc::new(SqliteAssistantStorage::in_memory("llm_os_storage").unwrap());
        orchestrator_with_storage(workspace, replies, storage)
    }

    /// Like [`orchestrator`] with the given run storage.
    pub fn orchestrator_with_storage(
        workspace: &Path,
        replies: Vec<ModelReply>,
        storage: Arc<dyn AssistantStorage>,
    ) -> Orchestrator {
        let mut settings = Settings::default();
        settings.general.workspace_dir = workspace.to_string_lossy().to_string();

        let knowledge = Arc::new(AssistantKnowledge::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(KeywordEmbedder::new(&["rust", "python", "essay"])),
        ));

        Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(ScriptedModel::new(replies)),
            knowledge,
            storage,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::orchestrator;
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_ingest_counts_documents() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path(), vec![]);

        let docs = vec![Document::new("essay", "An essay about Rust.")];
        let result = orchestrator.ingest("essay".to_string(), docs).await.unwrap();
        assert_eq!(result.documents_loaded, 1);
        assert!(!result.is_empty());
        assert!(orchestrator.knowledge().exists().await.unwrap());

        let empty = orchestrator.ingest("nothing".to_string(), vec![]).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_built_assistant_uses_shared_services() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path(), vec![]);

        let assistant = orchestrator.build_llm_os(&AssistantOptions::default()).unwrap();
        assert!(assistant.storage().is_some());
        assert!(assistant
            .function_names()
            .contains(&"search_knowledge_base".to_string()));
    }

    #[tokio::test]
    async fn test_add_pdf_missing_file() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(dir.path(), vec![]);
        assert!(orchestrator.add_pdf(&dir.path().join("missing.pdf")).await.is_err());
    }
}
