//! State behind one interactive chat session.
//!
//! A session owns the tool toggles, the current assistant and its run, and
//! the messages shown to the user. Changing a toggle or starting a new run
//! drops the assistant; the next turn rebuilds it.

use crate::assistant::{Assistant, AssistantOptions, AssistantResponse, Message};
use crate::config::Settings;
use crate::document::PdfReader;
use crate::error::LlmOsError;
use crate::orchestrator::{IngestResult, Orchestrator};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Shown after the knowledge base is emptied.
pub const KNOWLEDGE_CLEARED: &str = "Knowledge base cleared";

/// Errors surfaced to the person chatting.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Please enter a username")]
    MissingUser,

    #[error("Could not create assistant, is the database running?")]
    AssistantUnavailable(#[source] LlmOsError),

    #[error("Could not read website")]
    EmptyWebsite,

    #[error("Could not read PDF")]
    EmptyPdf,

    #[error("{0}")]
    InvalidCommand(String),

    #[error(transparent)]
    Core(#[from] LlmOsError),
}

/// A switchable toolkit or team member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toggle {
    Calculator,
    FileTools,
    DdgSearch,
    FinanceTools,
    PythonAssistant,
    ResearchAssistant,
}

impl Toggle {
    pub const ALL: [Toggle; 6] = [
        Toggle::Calculator,
        Toggle::FileTools,
        Toggle::DdgSearch,
        Toggle::FinanceTools,
        Toggle::PythonAssistant,
        Toggle::ResearchAssistant,
    ];

    /// Name used by `/toggle`.
    pub fn key(&self) -> &'static str {
        match self {
            Toggle::Calculator => "calculator",
            Toggle::FileTools => "files",
            Toggle::DdgSearch => "search",
            Toggle::FinanceTools => "finance",
            Toggle::PythonAssistant => "python",
            Toggle::ResearchAssistant => "research",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Toggle::Calculator => "Calculator",
            Toggle::FileTools => "File Tools",
            Toggle::DdgSearch => "Web Search",
            Toggle::FinanceTools => "Yahoo Finance",
            Toggle::PythonAssistant => "Python Assistant",
            Toggle::ResearchAssistant => "Research Assistant",
        }
    }

    /// True for team members, false for plain toolkits.
    pub fn is_team_member(&self) -> bool {
        matches!(self, Toggle::PythonAssistant | Toggle::ResearchAssistant)
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Toggle {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "calculator" | "calc" => Ok(Toggle::Calculator),
            "files" | "file-tools" => Ok(Toggle::FileTools),
            "search" | "web-search" | "ddg" | "ddg-search" => Ok(Toggle::DdgSearch),
            "finance" | "finance-tools" | "yfinance" => Ok(Toggle::FinanceTools),
            "python" | "python-assistant" => Ok(Toggle::PythonAssistant),
            "research" | "research-assistant" => Ok(Toggle::ResearchAssistant),
            other => Err(SessionError::InvalidCommand(format!(
                "Unknown toggle '{}'. Choose one of: {}",
                other,
                Toggle::ALL.map(|t| t.key()).join(", ")
            ))),
        }
    }
}

/// Enabled state of every [`Toggle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggles {
    pub calculator_enabled: bool,
    pub file_tools_enabled: bool,
    pub ddg_search_enabled: bool,
    pub finance_tools_enabled: bool,
    pub python_assistant_enabled: bool,
    pub research_assistant_enabled: bool,
}

impl Toggles {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            calculator_enabled: settings.tools.calculator,
            file_tools_enabled: settings.tools.file_tools,
            ddg_search_enabled: settings.tools.ddg_search,
            finance_tools_enabled: settings.tools.finance_tools,
            python_assistant_enabled: settings.team.python_assistant,
            research_assistant_enabled: settings.team.research_assistant,
        }
    }

    pub fn get(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::Calculator => self.calculator_enabled,
            Toggle::FileTools => self.file_tools_enabled,
            Toggle::DdgSearch => self.ddg_search_enabled,
            Toggle::FinanceTools => self.finance_tools_enabled,
            Toggle::PythonAssistant => self.python_assistant_enabled,
            Toggle::ResearchAssistant => self.research_assistant_enabled,
        }
    }

    fn slot(&mut self, toggle: Toggle) -> &mut bool {
        match toggle {
            Toggle::Calculator => &mut self.calculator_enabled,
            Toggle::FileTools => &mut self.file_tools_enabled,
            Toggle::DdgSearch => &mut self.ddg_search_enabled,
            Toggle::FinanceTools => &mut self.finance_tools_enabled,
            Toggle::PythonAssistant => &mut self.python_assistant_enabled,
            Toggle::ResearchAssistant => &mut self.research_assistant_enabled,
        }
    }

    pub fn set(&mut self, toggle: Toggle, enabled: bool) {
        *self.slot(toggle) = enabled;
    }

    /// Assistant flags for these toggles.
    pub fn options(&self, user_id: &str, run_id: Option<String>, debug_mode: bool) -> AssistantOptions {
        AssistantOptions {
            calculator: self.calculator_enabled,
            ddg_search: self.ddg_search_enabled,
            file_tools: self.file_tools_enabled,
            finance_tools: self.finance_tools_enabled,
            python_assistant: self.python_assistant_enabled,
            research_assistant: self.research_assistant_enabled,
            run_id,
            user_id: Some(user_id.to_string()),
            debug_mode,
        }
    }
}

/// Interactive chat state for one user.
pub struct SessionState {
    orchestrator: Arc<Orchestrator>,
    user_id: String,
    toggles: Toggles,
    assistant: Option<Assistant>,
    run_id: Option<String>,
    messages: Vec<Message>,
    uploaded: HashSet<String>,
    debug_mode: bool,
}

impl SessionState {
    /// Start a session. The user name must not be blank.
    pub fn new(orchestrator: Arc<Orchestrator>, user_id: &str) -> Result<Self, SessionError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(SessionError::MissingUser);
        }

        let toggles = Toggles::from_settings(orchestrator.settings());
        Ok(Self {
            orchestrator,
            user_id: user_id.to_string(),
            toggles,
            assistant: None,
            run_id: None,
            messages: Vec::new(),
            uploaded: HashSet::new(),
            debug_mode: false,
        })
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn toggles(&self) -> &Toggles {
        &self.toggles
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn assistant(&self) -> Option<&Assistant> {
        self.assistant.as_ref()
    }

    /// Messages currently on screen.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Flip a toggle and restart the assistant. Returns the new state.
    pub fn toggle(&mut self, toggle: Toggle) -> bool {
        let enabled = !self.toggles.get(toggle);
        self.toggles.set(toggle, enabled);
        info!("{} {}", toggle.label(), if enabled { "enabled" } else { "disabled" });
        self.restart();
        enabled
    }

    /// Drop the assistant and its run; the next turn starts a new one.
    pub fn restart(&mut self) {
        debug!("Restarting assistant");
        self.assistant = None;
        self.run_id = None;
        self.messages.clear();
    }

    /// Build the assistant if needed and make sure its run exists.
    pub async fn ensure_assistant(&mut self) -> Result<&mut Assistant, SessionError> {
        let (mut assistant, fresh) = match self.assistant.take() {
            Some(assistant) => (assistant, false),
            None => {
                info!("Creating LLM OS for {}", self.user_id);
                let options = self
                    .toggles
                    .options(&self.user_id, self.run_id.clone(), self.debug_mode);
                (self.orchestrator.build_llm_os(&options)?, true)
            }
        };

        if fresh || self.run_id.is_none() {
            match assistant.create_run().await {
                Ok(run_id) => self.run_id = Some(run_id),
                Err(e) => {
                    warn!("Could not create run: {}", e);
                    self.assistant = Some(assistant);
                    return Err(SessionError::AssistantUnavailable(e));
                }
            }
        }

        Ok(self.assistant.insert(assistant))
    }

    /// Refresh the displayed messages from the assistant's history.
    pub fn load_messages(&mut self) -> &[Message] {
        let history = self
            .assistant
            .as_ref()
            .map(|a| a.memory().get_chat_history().to_vec())
            .unwrap_or_default();

        self.messages = if history.is_empty() {
            debug!("No chat history found");
            let prompts = self.orchestrator.prompts();
            vec![Message::assistant(prompts.render_custom(&prompts.assistant.greeting))]
        } else {
            debug!("Loading chat history");
            history
        };
        &self.messages
    }

    /// Run one turn.
    pub async fn send(&mut self, prompt: &str) -> Result<AssistantResponse, SessionError> {
        let response = self.ensure_assistant().await?.run(prompt).await?;
        self.messages.push(Message::user(prompt));
        self.messages.push(Message::assistant(response.content.clone()));
        Ok(response)
    }

    fn mark_uploaded(&mut self, name: &str) -> bool {
        self.uploaded.insert(format!("{}_uploaded", name))
    }

    fn is_uploaded(&self, name: &str) -> bool {
        self.uploaded.contains(&format!("{}_uploaded", name))
    }

    /// Load a website into the knowledge base once per session.
    ///
    /// Returns `None` when the URL was already added.
    pub async fn add_url(&mut self, url: &str) -> Result<Option<IngestResult>, SessionError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SessionError::InvalidCommand("Usage: /add-url <url>".to_string()));
        }
        if self.is_uploaded(url) {
            debug!("{} already added", url);
            return Ok(None);
        }

        let result = self.orchestrator.add_url(url).await?;
        self.finish_ingest(url, result, SessionError::EmptyWebsite)
    }

    /// Load a PDF into the knowledge base once per session.
    pub async fn add_pdf(&mut self, path: &Path) -> Result<Option<IngestResult>, SessionError> {
        let name = PdfReader::source_name(path);
        if self.is_uploaded(&name) {
            debug!("{} already added", name);
            return Ok(None);
        }

        let result = self.orchestrator.add_pdf(path).await?;
        self.finish_ingest(&name, result, SessionError::EmptyPdf)
    }

    /// Mark a source as added; a source that produced no text is reported
    /// with `empty` but is not read again.
    fn finish_ingest(
        &mut self,
        name: &str,
        result: IngestResult,
        empty: SessionError,
    ) -> Result<Option<IngestResult>, SessionError> {
        self.mark_uploaded(name);
        if result.is_empty() {
            warn!("No text read from {}", name);
            return Err(empty);
        }
        Ok(Some(result))
    }

    /// Empty the knowledge base. Returns the number of chunks removed.
    pub async fn clear_knowledge(&mut self) -> Result<usize, SessionError> {
        let removed = self.orchestrator.knowledge().clear().await?;
        self.uploaded.clear();
        info!("Removed {} documents from the knowledge base", removed);
        Ok(removed)
    }

    /// Stored runs of this user, newest first.
    pub async fn run_ids(&self) -> Result<Vec<String>, SessionError> {
        Ok(self
            .orchestrator
            .storage()
            .get_all_run_ids(Some(&self.user_id))
            .await?)
    }

    /// Switch to a stored run. Returns false when it is already active.
    pub fn load_run(&mut self, run_id: &str) -> bool {
        if self.run_id.as_deref() == Some(run_id) {
            return false;
        }
        info!("Loading run: {}", run_id);
        self.restart();
        self.run_id = Some(run_id.to_string());
        true
    }

    /// LLM messages of each team member that has talked.
    pub fn team_memory(&self) -> Vec<(String, Vec<Message>)> {
        let Some(assistant) = &self.assistant else {
            return Vec::new();
        };
        assistant
            .team()
            .iter()
            .filter(|member| !member.memory().get_chat_history().is_empty())
            .map(|member| {
                (
                    member.name().unwrap_or("Assistant").to_string(),
                    member.memory().llm_messages.clone(),
                )
            })
            .collect()
    }
}

/// A `/command` typed into the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Tools,
    Toggle(Toggle),
    AddUrl(String),
    AddPdf(PathBuf),
    ClearKnowledge,
    Runs,
    Load(String),
    New,
    Team,
    Exit,
}

impl SlashCommand {
    /// Parse chat input. `None` means the input is a prompt.
    pub fn parse(input: &str) -> Option<Result<Self, SessionError>> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            return Some(Ok(SlashCommand::Exit));
        }
        let rest = input.strip_prefix('/')?;

        let (command, arg) = match rest.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (rest, ""),
        };

        let required = |usage: &str| {
            if arg.is_empty() {
                Err(SessionError::InvalidCommand(format!("Usage: {}", usage)))
            } else {
                Ok(arg.to_string())
            }
        };

        let parsed = match command.to_lowercase().as_str() {
            "help" | "?" => Ok(SlashCommand::Help),
            "tools" => Ok(SlashCommand::Tools),
            "toggle" => required("/toggle <name>").and_then(|name| name.parse().map(SlashCommand::Toggle)),
            "add-url" => required("/add-url <url>").map(SlashCommand::AddUrl),
            "add-pdf" => required("/add-pdf <path>").map(|p| SlashCommand::AddPdf(PathBuf::from(p))),
            "clear-kb" => Ok(SlashCommand::ClearKnowledge),
            "runs" => Ok(SlashCommand::Runs),
            "load" => required("/load <run id>").map(SlashCommand::Load),
            "new" => Ok(SlashCommand::New),
            "team" => Ok(SlashCommand::Team),
            "exit" | "quit" => Ok(SlashCommand::Exit),
            other => Err(SessionError::InvalidCommand(format!(
                "Unknown command '/{}'. Type /help for a list.",
                other
            ))),
        };
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::testing::call;
    use crate::assistant::{ModelReply, Role};
    use crate::document::Document;
    use crate::orchestrator::testing::{orchestrator, orchestrator_with_storage};
    use crate::storage::{AssistantRun, AssistantStorage, SqliteAssistantStorage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use serde_json::json;
    use tempfile::tempdir;

    fn session(dir: &Path, replies: Vec<ModelReply>) -> SessionState {
        SessionState::new(Arc::new(orchestrator(dir, replies)), "ada").unwrap()
    }

    #[test]
    fn test_username_required() {
        let dir = tempdir().unwrap();
        let result = SessionState::new(Arc::new(orchestrator(dir.path(), vec![])), "  ");
        assert!(matches!(result, Err(SessionError::MissingUser)));
        assert_eq!(SessionError::MissingUser.to_string(), "Please enter a username");
    }

    #[test]
    fn test_toggles_default_from_settings() {
        let dir = tempdir().unwrap();
        let state = session(dir.path(), vec![]);
        let toggles = state.toggles();
        assert!(toggles.calculator_enabled);
        assert!(toggles.ddg_search_enabled);
        assert!(toggles.research_assistant_enabled);
        assert!(!toggles.python_assistant_enabled);
    }

    #[tokio::test]
    async fn test_toggle_restarts_assistant() {
        let dir = tempdir().unwrap();
        let mut state = session(dir.path(), vec![]);

        state.ensure_assistant().await.unwrap();
        assert!(state.run_id().is_some());
        assert!(state
            .assistant()
            .unwrap()
            .function_names()
            .contains(&"add".to_string()));

        assert!(!state.toggle(Toggle::Calculator));
        assert!(state.assistant().is_none());
        assert!(state.run_id().is_none());

        let assistant = state.ensure_assistant().await.unwrap();
        assert!(!assistant.function_names().contains(&"add".to_string()));
    }

    #[tokio::test]
    async fn test_load_messages_greeting_then_history() {
        let dir = tempdir().unwrap();
        let mut state = session(dir.path(), vec![ModelReply::text("Hello Ada")]);

        let messages = state.load_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Ask me anything...");

        state.send("hi").await.unwrap();
        let messages = state.load_messages().to_vec();
        assert!(messages.iter().any(|m| m.role == Role::User && m.content == "hi"));
        assert_eq!(messages.last().unwrap().content, "Hello Ada");
    }

    #[tokio::test]
    async fn test_send_shows_tool_calls() {
        let dir = tempdir().unwrap();
        let mut state = session(
            dir.path(),
            vec![
                ModelReply::calls(vec![call("c1", "add", json!({"a": 2, "b": 3}))]),
                ModelReply::text("5"),
            ],
        );

        let response = state.send("2 + 3?").await.unwrap();
        assert!(response.content.contains(" - Running: add("));
        assert!(response.content.ends_with("5"));
        assert_eq!(state.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_load_run_resumes_history() {
        let dir = tempdir().unwrap();
        let orchestrator = Arc::new(orchestrator(dir.path(), vec![ModelReply::text("first answer")]));

        let mut first = SessionState::new(orchestrator.clone(), "ada").unwrap();
        first.send("first question").await.unwrap();
        let run_id = first.run_id().unwrap().to_string();

        let mut second = SessionState::new(orchestrator, "ada").unwrap();
        assert_eq!(second.run_ids().await.unwrap(), vec![run_id.clone()]);
        assert!(second.load_run(&run_id));
        assert!(!second.load_run(&run_id));

        second.ensure_assistant().await.unwrap();
        assert_eq!(second.run_id(), Some(run_id.as_str()));
        let messages = second.load_messages();
        assert!(messages.iter().any(|m| m.content == "first answer"));
    }

    #[tokio::test]
    async fn test_clear_knowledge() {
        let dir = tempdir().unwrap();
        let mut state = session(dir.path(), vec![]);
        state
            .orchestrator
            .knowledge()
            .load_documents(vec![Document::new("essay", "An essay about Rust.")], true)
            .await
            .unwrap();
        state.mark_uploaded("essay");

        assert_eq!(state.clear_knowledge().await.unwrap(), 1);
        assert!(!state.orchestrator.knowledge().exists().await.unwrap());
        assert!(!state.is_uploaded("essay"));
    }

    #[tokio::test]
    async fn test_add_pdf_skips_repeat_upload() {
        let dir = tempdir().unwrap();
        let mut state = session(dir.path(), vec![]);
        state.mark_uploaded("report");

        let result = state.add_pdf(&dir.path().join("report.pdf")).await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_team_memory_empty_without_assistant() {
        let dir = tempdir().unwrap();
        let state = session(dir.path(), vec![]);
        assert!(state.team_memory().is_empty());
    }

    #[test]
    fn test_parse_slash_commands() {
        assert!(SlashCommand::parse("what is 10!").is_none());
        assert_eq!(SlashCommand::parse("/tools").unwrap().unwrap(), SlashCommand::Tools);
        assert_eq!(SlashCommand::parse("exit").unwrap().unwrap(), SlashCommand::Exit);
        assert_eq!(
            SlashCommand::parse("/toggle web-search").unwrap().unwrap(),
            SlashCommand::Toggle(Toggle::DdgSearch)
        );
        assert_eq!(
            SlashCommand::parse("/add-url https://example.com").unwrap().unwrap(),
            SlashCommand::AddUrl("https://example.com".to_string())
        );
        assert_eq!(
            SlashCommand::parse("/add-pdf ./paper.pdf").unwrap().unwrap(),
            SlashCommand::AddPdf(PathBuf::from("./paper.pdf"))
        );
        assert_eq!(
            SlashCommand::parse("/load abc").unwrap().unwrap(),
            SlashCommand::Load("abc".to_string())
        );
        assert!(SlashCommand::parse("/load").unwrap().is_err());
        assert!(SlashCommand::parse("/toggle nothing").unwrap().is_err());
        assert!(SlashCommand::parse("/frobnicate").unwrap().is_err());
    }

    /// Run storage that fails while `down` is set.
    struct FlakyStorage {
        inner: SqliteAssistantStorage,
        down: AtomicBool,
    }

    impl FlakyStorage {
        fn check(&self) -> crate::Result<()> {
            if self.down.load(Ordering::SeqCst) {
                Err(LlmOsError::Storage("database is not running".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl AssistantStorage for FlakyStorage {
        async fn create(&self) -> crate::Result<()> {
            self.check()?;
            self.inner.create().await
        }

        async fn read(&self, run_id: &str) -> crate::Result<Option<AssistantRun>> {
            self.check()?;
            self.inner.read(run_id).await
        }

        async fn upsert(&self, run: &AssistantRun) -> crate::Result<AssistantRun> {
            self.check()?;
            self.inner.upsert(run).await
        }

        async fn get_all_run_ids(&self, user_id: Option<&str>) -> crate::Result<Vec<String>> {
            self.inner.get_all_run_ids(user_id).await
        }

        async fn get_all_runs(&self, user_id: Option<&str>) -> crate::Result<Vec<AssistantRun>> {
            self.inner.get_all_runs(user_id).await
        }

        async fn delete(&self, run_id: &str) -> crate::Result<bool> {
            self.inner.delete(run_id).await
        }
    }

    #[tokio::test]
    async fn test_storage_failure_warns_and_session_recovers() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(FlakyStorage {
            inner: SqliteAssistantStorage::in_memory("llm_os_storage").unwrap(),
            down: AtomicBool::new(true),
        });
        let orchestrator = orchestrator_with_storage(
            dir.path(),
            vec![ModelReply::text("Back online")],
            storage.clone(),
        );
        let mut state = SessionState::new(Arc::new(orchestrator), "ada").unwrap();

        let err = state.ensure_assistant().await.err().unwrap();
        assert!(matches!(err, SessionError::AssistantUnavailable(_)));
        assert_eq!(
            err.to_string(),
            "Could not create assistant, is the database running?"
        );
        assert!(state.run_id().is_none());
        assert!(state.assistant().is_some());
        assert_eq!(state.load_messages()[0].content, "Ask me anything...");

        let err = state.send("hello").await.unwrap_err();
        assert!(matches!(err, SessionError::AssistantUnavailable(_)));
        assert_eq!(state.messages().len(), 1);

        storage.down.store(false, Ordering::SeqCst);
        let response = state.send("hello").await.unwrap();
        assert_eq!(response.content, "Back online");
        assert!(state.run_id().is_some());
    }

    #[tokio::test]
    async fn test_add_url_without_text_is_reported_once() {
        let app = axum::Router::new().route(
            "/",
            axum::routing::get(|| async {
                axum::response::Html("<html><body><script>track()</script></body></html>")
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await });

        let dir = tempdir().unwrap();
        let mut state = session(dir.path(), vec![]);

        let err = state.add_url(&url).await.unwrap_err();
        assert!(matches!(err, SessionError::EmptyWebsite));
        assert_eq!(err.to_string(), "Could not read website");

        assert!(state.add_url(&url).await.unwrap().is_none());
    }

    #[test]
    fn test_empty_pdf_is_reported_and_marked() {
        let dir = tempdir().unwrap();
        let mut state = session(dir.path(), vec![]);
        let empty = IngestResult {
            name: "scan".to_string(),
            documents_read: 0,
            documents_loaded: 0,
        };

        let err = state.finish_ingest("scan", empty, SessionError::EmptyPdf).unwrap_err();
        assert!(matches!(err, SessionError::EmptyPdf));
        assert_eq!(err.to_string(), "Could not read PDF");
        assert!(state.is_uploaded("scan"));
    }
}
