//! Builder for [`Assistant`].

use super::memory::AssistantMemory;
use super::model::ChatModel;
use super::runner::Assistant;
use crate::knowledge::AssistantKnowledge;
use crate::storage::AssistantStorage;
use crate::tools::{ToolRegistry, Toolkit};
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_MAX_ITERATIONS: usize = 15;
const DEFAULT_HISTORY_MESSAGES: usize = 6;

/// Configures and builds an [`Assistant`].
pub struct AssistantBuilder {
    assistant: Assistant,
}

impl AssistantBuilder {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self {
            assistant: Assistant {
                llm,
                name: None,
                role: None,
                description: None,
                instructions: Vec::new(),
                extra_instructions: Vec::new(),
                expected_output: None,
                introduction: None,
                tools: ToolRegistry::new(),
                team: Vec::new(),
                run_id: None,
                run_name: None,
                user_id: None,
                storage: None,
                knowledge: None,
                memory: AssistantMemory::default(),
                markdown: false,
                show_tool_calls: false,
                search_knowledge: false,
                read_chat_history: false,
                add_chat_history_to_messages: false,
                num_history_messages: DEFAULT_HISTORY_MESSAGES,
                add_datetime_to_instructions: false,
                debug_mode: false,
                save_output_to_file: None,
                output_dir: PathBuf::from("."),
                max_iterations: DEFAULT_MAX_ITERATIONS,
                created_at: None,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.assistant.name = Some(name.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.assistant.role = Some(role.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.assistant.description = Some(description.into());
        self
    }

    pub fn instructions(mut self, instructions: Vec<String>) -> Self {
        self.assistant.instructions = instructions;
        self
    }

    pub fn extra_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.assistant.extra_instructions.push(instruction.into());
        self
    }

    pub fn extra_instructions(mut self, instructions: Vec<String>) -> Self {
        self.assistant.extra_instructions.extend(instructions);
        self
    }

    pub fn expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.assistant.expected_output = Some(expected_output.into());
        self
    }

    /// First assistant message of a new run.
    pub fn introduction(mut self, introduction: impl Into<String>) -> Self {
        self.assistant.introduction = Some(introduction.into());
        self
    }

    pub fn tool(mut self, toolkit: Arc<dyn Toolkit>) -> Self {
        self.assistant.tools.register(toolkit);
        self
    }

    pub fn tools(mut self, toolkits: Vec<Arc<dyn Toolkit>>) -> Self {
        for toolkit in toolkits {
            self.assistant.tools.register(toolkit);
        }
        self
    }

    pub fn team_member(mut self, member: Assistant) -> Self {
        self.assistant.team.push(member);
        self
    }

    pub fn team(mut self, members: Vec<Assistant>) -> Self {
        self.assistant.team.extend(members);
        self
    }

    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.assistant.run_id = Some(run_id.into());
        self
    }

    /// Set the run id only when one is given.
    pub fn maybe_run_id(mut self, run_id: Option<String>) -> Self {
        self.assistant.run_id = run_id;
        self
    }

    pub fn run_name(mut self, run_name: impl Into<String>) -> Self {
        self.assistant.run_name = Some(run_name.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.assistant.user_id = Some(user_id.into());
        self
    }

    pub fn maybe_user_id(mut self, user_id: Option<String>) -> Self {
        self.assistant.user_id = user_id;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn AssistantStorage>) -> Self {
        self.assistant.storage = Some(storage);
        self
    }

    pub fn knowledge(mut self, knowledge: Arc<AssistantKnowledge>) -> Self {
        self.assistant.knowledge = Some(knowledge);
        self
    }

    pub fn markdown(mut self, enabled: bool) -> Self {
        self.assistant.markdown = enabled;
        self
    }

    /// Prefix answers with the tool calls that produced them.
    pub fn show_tool_calls(mut self, enabled: bool) -> Self {
        self.assistant.show_tool_calls = enabled;
        self
    }

    /// Offer the `search_knowledge_base` function.
    pub fn search_knowledge(mut self, enabled: bool) -> Self {
        self.assistant.search_knowledge = enabled;
        self
    }

    /// Offer the `get_chat_history` function.
    pub fn read_chat_history(mut self, enabled: bool) -> Self {
        self.assistant.read_chat_history = enabled;
        self
    }

    pub fn add_chat_history_to_messages(mut self, enabled: bool) -> Self {
        self.assistant.add_chat_history_to_messages = enabled;
        self
    }

    pub fn num_history_messages(mut self, n: usize) -> Self {
        self.assistant.num_history_messages = n;
        self
    }

    pub fn add_datetime_to_instructions(mut self, enabled: bool) -> Self {
        self.assistant.add_datetime_to_instructions = enabled;
        self
    }

    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.assistant.debug_mode = enabled;
        self
    }

    /// Write each answer to this path; `{run_id}` is replaced.
    pub fn save_output_to_file(mut self, template: impl Into<String>) -> Self {
        self.assistant.save_output_to_file = Some(template.into());
        self
    }

    /// Base directory for relative output paths.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assistant.output_dir = dir.into();
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.assistant.max_iterations = max.max(1);
        self
    }

    pub fn build(self) -> Assistant {
        self.assistant
    }
}
