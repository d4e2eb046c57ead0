//! The LLM OS assistant: a tool-calling loop with memory, a knowledge base
//! and a team of delegate assistants.

mod builder;
mod llm_os;
mod memory;
mod model;
mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::AssistantBuilder;
pub use llm_os::{build_llm_os, AssistantDeps, AssistantOptions};
pub use memory::{AssistantMemory, Message, Role, ToolCall};
pub use model::{ChatModel, ModelReply, OpenAIChatModel};
pub use runner::{Assistant, AssistantResponse, ToolCallRecord};
