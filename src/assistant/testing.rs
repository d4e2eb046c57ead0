//! Scripted chat model for tests.

use super::memory::{Message, ToolCall};
use super::model::{ChatModel, ModelReply};
use crate::error::{LlmOsError, Result};
use crate::tools::FunctionSpec;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued replies and records what it was sent.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ModelReply>>,
    requests: Mutex<Vec<(Vec<Message>, Vec<String>)>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Messages and offered function names of every completion request.
    pub fn requests(&self) -> Vec<(Vec<Message>, Vec<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

/// Shorthand for a tool call with JSON arguments.
pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[Message], functions: &[FunctionSpec]) -> Result<ModelReply> {
        self.requests.lock().unwrap().push((
            messages.to_vec(),
            functions.iter().map(|f| f.name.clone()).collect(),
        ));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmOsError::Agent("Script exhausted".to_string()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
