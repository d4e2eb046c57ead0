//! Conversation messages and per-run memory.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(name)
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Function name for tool results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant message that requests tool calls.
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Result of a tool call.
    pub fn tool(tool_call_id: &str, name: &str, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.to_string()),
            tool_call_id: Some(tool_call_id.to_string()),
            ..Self::new(Role::Tool, content)
        }
    }
}

/// Memory of a run.
///
/// `chat_history` holds what the user sees (user prompts and final answers);
/// `llm_messages` holds everything exchanged with the model, tool traffic
/// included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMemory {
    #[serde(default)]
    pub chat_history: Vec<Message>,
    #[serde(default)]
    pub llm_messages: Vec<Message>,
}

impl AssistantMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chat_message(&mut self, message: Message) {
        self.chat_history.push(message);
    }

    pub fn add_llm_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.llm_messages.extend(messages);
    }

    pub fn get_chat_history(&self) -> &[Message] {
        &self.chat_history
    }

    /// The last `n` chat messages, oldest first.
    pub fn get_last_n_messages(&self, n: usize) -> &[Message] {
        let start = self.chat_history.len().saturating_sub(n);
        &self.chat_history[start..]
    }

    /// Chat history as `role: content` lines.
    pub fn get_formatted_chat_history(&self) -> String {
        self.chat_history
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Chat history as user/assistant exchange pairs.
    ///
    /// Messages before the first user message (the introduction) are skipped.
    pub fn get_chats(&self) -> Vec<(Message, Message)> {
        let mut chats = Vec::new();
        let mut pending_user: Option<&Message> = None;

        for message in &self.chat_history {
            match message.role {
                Role::User => pending_user = Some(message),
                Role::Assistant => {
                    if let Some(user) = pending_user.take() {
                        chats.push((user.clone(), message.clone()));
                    }
                }
                _ => {}
            }
        }

        chats
    }

    pub fn is_empty(&self) -> bool {
        self.chat_history.is_empty() && self.llm_messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.chat_history.clear();
        self.llm_messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> AssistantMemory {
        let mut memory = AssistantMemory::new();
        memory.add_chat_message(Message::assistant("Hi, I'm your LLM OS."));
        memory.add_chat_message(Message::user("What is 2+2?"));
        memory.add_chat_message(Message::assistant("4"));
        memory.add_chat_message(Message::user("And 3+3?"));
        memory.add_chat_message(Message::assistant("6"));
        memory
    }

    #[test]
    fn test_last_n_messages() {
        let memory = memory();
        let last = memory.get_last_n_messages(2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].content, "And 3+3?");
        assert_eq!(memory.get_last_n_messages(50).len(), 5);
    }

    #[test]
    fn test_chats_pair_user_and_assistant() {
        let chats = memory().get_chats();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].0.content, "What is 2+2?");
        assert_eq!(chats[1].1.content, "6");
    }

    #[test]
    fn test_formatted_history_and_clear() {
        let mut memory = memory();
        assert!(memory.get_formatted_chat_history().starts_with("assistant: Hi"));
        assert!(memory.get_formatted_chat_history().contains("user: What is 2+2?"));

        memory.add_llm_messages(vec![Message::tool("call_1", "add", "4")]);
        assert!(!memory.is_empty());
        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_message_serialization_skips_empty_fields() {
        let json = serde_json::to_value(Message::user("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hello"}));

        let tool = serde_json::to_value(Message::tool("call_1", "add", "4")).unwrap();
        assert_eq!(tool["tool_call_id"], "call_1");
        assert_eq!(tool["name"], "add");
    }
}
