//! The assistant and its tool-calling loop.

use super::memory::{AssistantMemory, Message, Role, ToolCall};
use super::model::ChatModel;
use crate::error::{LlmOsError, Result};
use crate::knowledge::{format_references, AssistantKnowledge};
use crate::storage::{AssistantRun, AssistantStorage};
use crate::tools::{opt_u64_arg, str_arg, FunctionSpec, ToolRegistry};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub(super) const SEARCH_KNOWLEDGE_FN: &str = "search_knowledge_base";
pub(super) const CHAT_HISTORY_FN: &str = "get_chat_history";
pub(super) const DELEGATE_PREFIX: &str = "delegate_task_";

/// An LLM assistant with tools, a team and persistent memory.
///
/// Built with [`AssistantBuilder`](super::AssistantBuilder).
pub struct Assistant {
    pub(super) llm: Arc<dyn ChatModel>,
    pub(super) name: Option<String>,
    pub(super) role: Option<String>,
    pub(super) description: Option<String>,
    pub(super) instructions: Vec<String>,
    pub(super) extra_instructions: Vec<String>,
    pub(super) expected_output: Option<String>,
    pub(super) introduction: Option<String>,
    pub(super) tools: ToolRegistry,
    pub(super) team: Vec<Assistant>,
    pub(super) run_id: Option<String>,
    pub(super) run_name: Option<String>,
    pub(super) user_id: Option<String>,
    pub(super) storage: Option<Arc<dyn AssistantStorage>>,
    pub(super) knowledge: Option<Arc<AssistantKnowledge>>,
    pub(super) memory: AssistantMemory,
    pub(super) markdown: bool,
    pub(super) show_tool_calls: bool,
    pub(super) search_knowledge: bool,
    pub(super) read_chat_history: bool,
    pub(super) add_chat_history_to_messages: bool,
    pub(super) num_history_messages: usize,
    pub(super) add_datetime_to_instructions: bool,
    pub(super) debug_mode: bool,
    /// Output file template; `{run_id}` is replaced.
    pub(super) save_output_to_file: Option<String>,
    /// Base directory for a relative `save_output_to_file`.
    pub(super) output_dir: PathBuf,
    pub(super) max_iterations: usize,
    pub(super) created_at: Option<chrono::DateTime<Utc>>,
}

/// Response from an assistant run.
#[derive(Debug, Clone)]
pub struct AssistantResponse {
    /// The final answer, prefixed by the tool calls when `show_tool_calls` is on.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the assistant.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the function called.
    pub name: String,
    /// JSON arguments passed to the function.
    pub arguments: String,
    /// Result returned by the function.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, format_arguments(&self.arguments))
    }
}

/// `{"a": 1, "b": "x"}` as `a=1, b=x`.
fn format_arguments(arguments: &str) -> String {
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}={}", k, s),
                other => format!("{}={}", k, other),
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => arguments.to_string(),
    }
}

impl Assistant {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn memory(&self) -> &AssistantMemory {
        &self.memory
    }

    pub fn team(&self) -> &[Assistant] {
        &self.team
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn knowledge(&self) -> Option<&Arc<AssistantKnowledge>> {
        self.knowledge.as_ref()
    }

    pub fn storage(&self) -> Option<&Arc<dyn AssistantStorage>> {
        self.storage.as_ref()
    }

    /// Every function offered to the model: toolkits, built-ins and delegation.
    pub fn functions(&self) -> Vec<FunctionSpec> {
        let mut functions = self.tools.functions();

        if self.search_knowledge && self.knowledge.is_some() {
            functions.push(FunctionSpec::new(
                SEARCH_KNOWLEDGE_FN,
                "Use this function to search the knowledge base for information about a query.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Query to search for."}
                    },
                    "required": ["query"]
                }),
            ));
        }

        if self.read_chat_history {
            functions.push(FunctionSpec::new(
                CHAT_HISTORY_FN,
                "Use this function to get the chat history between the user and assistant. \
                 Pass `num_chats` to limit the number of exchanges; omit it for the whole history.",
                json!({
                    "type": "object",
                    "properties": {
                        "num_chats": {"type": ["integer", "null"], "description": "Number of chats to return."}
                    }
                }),
            ));
        }

        for (index, member) in self.team.iter().enumerate() {
            let member_name = member.name().unwrap_or("a team member");
            functions.push(FunctionSpec::new(
                &format!("{}{}", DELEGATE_PREFIX, index),
                &format!(
                    "Use this function to delegate a task to {}. Returns the response from the assistant.",
                    member_name
                ),
                json!({
                    "type": "object",
                    "properties": {
                        "task_description": {"type": "string", "description": "A clear and concise description of the task the assistant should achieve."},
                        "expected_output": {"type": "string", "description": "The expected output from the assistant."},
                        "additional_information": {"type": "string", "description": "Additional information that will help the assistant complete the task."}
                    },
                    "required": ["task_description"]
                }),
            ));
        }

        functions
    }

    /// Names of every function offered to the model.
    pub fn function_names(&self) -> Vec<String> {
        self.functions().into_iter().map(|f| f.name).collect()
    }

    /// Assemble the system prompt.
    pub fn system_prompt(&self) -> String {
        let mut prompt = String::new();

        if let Some(description) = &self.description {
            prompt.push_str(description.trim());
            prompt.push('\n');
        }
        if let Some(role) = &self.role {
            prompt.push_str(&format!("\nYour role is: {}\n", role));
        }

        let mut instructions: Vec<String> = self
            .instructions
            .iter()
            .chain(self.extra_instructions.iter())
            .cloned()
            .collect();
        if self.markdown {
            instructions.push("Use markdown to format your answers.".to_string());
        }
        if self.add_datetime_to_instructions {
            instructions.push(format!(
                "The current time is {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }

        if !instructions.is_empty() {
            prompt.push_str("\nYOU MUST FOLLOW THESE INSTRUCTIONS CAREFULLY.\n<instructions>\n");
            for (i, instruction) in instructions.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", i + 1, instruction));
            }
            prompt.push_str("</instructions>\n");
        }

        if !self.team.is_empty() {
            prompt.push_str("\nYou can delegate tasks to the following assistants:\n<assistants>\n");
            for (index, member) in self.team.iter().enumerate() {
                prompt.push_str(&format!("Assistant {}:\n", index + 1));
                if let Some(name) = member.name() {
                    prompt.push_str(&format!("Name: {}\n", name));
                }
                if let Some(role) = member.role() {
                    prompt.push_str(&format!("Role: {}\n", role));
                }
                let tool_names = member.tools.function_names();
                if !tool_names.is_empty() {
                    prompt.push_str(&format!("Available tools: {}\n", tool_names.join(", ")));
                }
                prompt.push_str(&format!(
                    "Delegate with: {}{}\n\n",
                    DELEGATE_PREFIX, index
                ));
            }
            prompt.push_str("</assistants>\n");
        }

        if let Some(expected_output) = &self.expected_output {
            prompt.push_str(&format!(
                "\nProvide your output in the following format:\n<expected_output>\n{}\n</expected_output>\n",
                expected_output.trim()
            ));
        }

        prompt.trim().to_string()
    }

    /// Start or resume the run.
    ///
    /// Assigns a fresh run id when none is set, restores memory from storage
    /// when the run exists there, and stores a new run otherwise.
    #[instrument(skip(self), fields(assistant = self.name.as_deref().unwrap_or("assistant")))]
    pub async fn create_run(&mut self) -> Result<String> {
        let run_id = match &self.run_id {
            Some(id) => id.clone(),
            None => {
                let id = Uuid::new_v4().to_string();
                self.run_id = Some(id.clone());
                id
            }
        };

        if let Some(storage) = self.storage.clone() {
            storage.create().await?;
            match storage.read(&run_id).await? {
                Some(run) => {
                    info!("Resuming run {}", run_id);
                    self.memory = run.memory;
                    self.created_at = Some(run.created_at);
                    if self.user_id.is_none() {
                        self.user_id = run.user_id;
                    }
                    if self.run_name.is_none() {
                        self.run_name = run.run_name;
                    }
                }
                None => {
                    self.add_introduction();
                    self.write_to_storage().await?;
                    info!("Created run {}", run_id);
                }
            }
        } else {
            self.add_introduction();
        }

        Ok(run_id)
    }

    fn add_introduction(&mut self) {
        if let Some(introduction) = &self.introduction {
            if self.memory.chat_history.is_empty() {
                self.memory
                    .add_chat_message(Message::assistant(introduction.clone()));
            }
        }
    }

    /// The run as it would be persisted.
    pub fn to_run(&self) -> Option<AssistantRun> {
        let run_id = self.run_id.clone()?;
        let mut run = AssistantRun::new(run_id, self.user_id.clone());
        run.name = self.name.clone();
        run.run_name = self.run_name.clone();
        run.llm = self.llm.describe();
        run.memory = self.memory.clone();
        run.assistant_data = json!({
            "tools": self.tools.function_names(),
            "team": self.team.iter().filter_map(|m| m.name.clone()).collect::<Vec<_>>(),
        });
        if let Some(created_at) = self.created_at {
            run.created_at = created_at;
        }
        Some(run)
    }

    async fn write_to_storage(&mut self) -> Result<()> {
        let (Some(storage), Some(run)) = (self.storage.clone(), self.to_run()) else {
            return Ok(());
        };
        let stored = storage.upsert(&run).await?;
        self.created_at = Some(stored.created_at);
        Ok(())
    }

    /// Run one user turn to completion.
    #[instrument(skip(self, message), fields(assistant = self.name.as_deref().unwrap_or("assistant")))]
    pub async fn run(&mut self, message: &str) -> Result<AssistantResponse> {
        if self.run_id.is_none() || (self.created_at.is_none() && self.storage.is_some()) {
            self.create_run().await?;
        }

        let mut messages = vec![Message::system(self.system_prompt())];
        if self.add_chat_history_to_messages {
            messages.extend(
                self.memory
                    .get_last_n_messages(self.num_history_messages)
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .cloned(),
            );
        }
        let turn_start = messages.len();
        messages.push(Message::user(message));

        let functions = self.functions();
        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        let answer = loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(LlmOsError::Agent(format!(
                    "Assistant exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Assistant iteration {}", iterations);
            if self.debug_mode {
                debug!("Sending {} messages: {:?}", messages.len(), messages.last());
            }

            let reply = self.llm.complete(&messages, &functions).await?;
            let content = reply.content.unwrap_or_default();

            if reply.tool_calls.is_empty() {
                messages.push(Message::assistant(content.clone()));
                break content;
            }

            messages.push(Message::assistant_tool_calls(content, reply.tool_calls.clone()));
            for tool_call in &reply.tool_calls {
                let record = self.execute_tool_call(tool_call).await;
                messages.push(Message::tool(&tool_call.id, &tool_call.name, record.result.clone()));
                tool_calls_made.push(record);
            }
        };

        self.memory.add_chat_message(Message::user(message));
        self.memory.add_chat_message(Message::assistant(answer.clone()));
        self.memory.add_llm_messages(messages.drain(turn_start..));

        if let Err(e) = self.write_to_storage().await {
            warn!("Failed to store run: {}", e);
        }
        self.save_output(&answer).await;

        let content = if self.show_tool_calls && !tool_calls_made.is_empty() {
            let calls: String = tool_calls_made
                .iter()
                .map(|r| format!(" - Running: {}\n", r))
                .collect();
            format!("{}\n{}", calls, answer)
        } else {
            answer
        };

        Ok(AssistantResponse {
            content,
            tool_calls: tool_calls_made,
            iterations,
        })
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&mut self, tool_call: &ToolCall) -> ToolCallRecord {
        let name = &tool_call.name;
        let arguments = &tool_call.arguments;

        info!("Assistant calling tool: {} with args: {}", name, arguments);

        let raw_args = if arguments.trim().is_empty() { "{}" } else { arguments.as_str() };
        let result = match serde_json::from_str::<Value>(raw_args) {
            Ok(args) => match self.dispatch(name, &args).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        };

        if self.debug_mode {
            debug!("Tool {} returned: {}", name, result);
        }

        ToolCallRecord {
            name: name.clone(),
            arguments: arguments.clone(),
            result,
        }
    }

    async fn dispatch(&mut self, name: &str, args: &Value) -> Result<String> {
        if name == SEARCH_KNOWLEDGE_FN && self.search_knowledge {
            return self.search_knowledge_base(str_arg(args, "query")?).await;
        }
        if name == CHAT_HISTORY_FN && self.read_chat_history {
            let num_chats = opt_u64_arg(args, "num_chats").map(|n| n as usize);
            return self.get_chat_history(num_chats);
        }
        if let Some(index) = name
            .strip_prefix(DELEGATE_PREFIX)
            .and_then(|i| i.parse::<usize>().ok())
        {
            return self.delegate(index, args.clone()).await;
        }
        self.tools.call(name, args).await
    }

    async fn search_knowledge_base(&self, query: &str) -> Result<String> {
        let knowledge = self
            .knowledge
            .as_ref()
            .ok_or_else(|| LlmOsError::Knowledge("No knowledge base configured".to_string()))?;

        let results = knowledge.search(query).await?;
        if results.is_empty() {
            return Ok("No documents found".to_string());
        }
        Ok(format_references(&results))
    }

    /// The last `num_chats` exchanges (all when None) as a JSON list.
    pub fn get_chat_history(&self, num_chats: Option<usize>) -> Result<String> {
        let chats = self.memory.get_chats();
        let start = match num_chats {
            Some(n) => chats.len().saturating_sub(n),
            None => 0,
        };

        let history: Vec<&Message> = chats[start..]
            .iter()
            .flat_map(|(user, assistant)| [user, assistant])
            .collect();
        Ok(serde_json::to_string(&history)?)
    }

    fn delegate(&mut self, index: usize, args: Value) -> BoxFuture<'_, Result<String>> {
        async move {
            let task = str_arg(&args, "task_description")?;
            let mut prompt = format!("Task: {}", task);
            if let Some(expected) = args.get("expected_output").and_then(Value::as_str) {
                prompt.push_str(&format!("\n\nExpected output: {}", expected));
            }
            if let Some(info) = args.get("additional_information").and_then(Value::as_str) {
                prompt.push_str(&format!("\n\nAdditional information: {}", info));
            }

            let member = self
                .team
                .get_mut(index)
                .ok_or_else(|| LlmOsError::Agent(format!("No team member at index {}", index)))?;
            info!("Delegating to {}", member.name().unwrap_or("team member"));

            let response = member.run(&prompt).await?;
            Ok(response.content)
        }
        .boxed()
    }

    async fn save_output(&self, content: &str) {
        let (Some(template), Some(run_id)) = (&self.save_output_to_file, &self.run_id) else {
            return;
        };

        let path = self.output_dir.join(template.replace("{run_id}", run_id));
        let written = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, content).await
        }
        .await;

        match written {
            Ok(()) => info!("Saved output to {}", path.display()),
            Err(e) => warn!("Failed to save output to {}: {}", path.display(), e),
        }
    }
}
