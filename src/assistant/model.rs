//! Chat model seam used by the assistant loop.

use super::memory::{Message, Role, ToolCall};
use crate::config::LlmSettings;
use crate::error::{LlmOsError, Result};
use crate::openai::create_client_for;
use crate::tools::FunctionSpec;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument};

/// What the model answered in one completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    /// A plain text answer.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// A reply that requests tool calls.
    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete a conversation, offering `functions` as callable tools.
    async fn complete(&self, messages: &[Message], functions: &[FunctionSpec]) -> Result<ModelReply>;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Settings recorded with each run.
    fn describe(&self) -> Value {
        json!({"model": self.model()})
    }
}

/// Chat model served by an OpenAI-compatible API.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIChatModel {
    pub fn new(settings: &LlmSettings) -> Self {
        Self {
            client: create_client_for(settings.api_base.as_deref()),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

impl From<&LlmSettings> for OpenAIChatModel {
    fn from(settings: &LlmSettings) -> Self {
        Self::new(settings)
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let converted: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(|e| LlmOsError::Agent(e.to_string()))?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(|e| LlmOsError::Agent(e.to_string()))?
            .into(),
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !message.content.is_empty() {
                args.content(message.content.clone());
            }
            if !message.tool_calls.is_empty() {
                let calls: Vec<ChatCompletionMessageToolCall> = message
                    .tool_calls
                    .iter()
                    .map(|c| ChatCompletionMessageToolCall {
                        id: c.id.clone(),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall {
                            name: c.name.clone(),
                            arguments: c.arguments.clone(),
                        },
                    })
                    .collect();
                args.tool_calls(calls);
            }
            args.build()
                .map_err(|e| LlmOsError::Agent(e.to_string()))?
                .into()
        }
        Role::Tool => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(message.tool_call_id.clone().unwrap_or_default())
            .content(message.content.clone())
            .build()
            .map_err(|e| LlmOsError::Agent(e.to_string()))?
            .into(),
    };
    Ok(converted)
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[Message], functions: &[FunctionSpec]) -> Result<ModelReply> {
        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(request_messages)
            .max_completion_tokens(self.max_tokens)
            .temperature(self.temperature);
        if !functions.is_empty() {
            args.tools(functions.iter().map(FunctionSpec::to_openai).collect::<Vec<_>>());
        }
        let request = args.build().map_err(|e| LlmOsError::Agent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmOsError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmOsError::Agent("No response from model".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCall {
                id: c.id,
                name: c.function.name,
                arguments: c.function.arguments,
            })
            .collect::<Vec<_>>();

        debug!("Model replied with {} tool calls", tool_calls.len());
        Ok(ModelReply {
            content: choice.message.content,
            tool_calls,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn describe(&self) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_every_role() {
        let messages = vec![
            Message::system("be helpful"),
            Message::user("add 1 and 2"),
            Message::assistant_tool_calls(
                "",
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "add".to_string(),
                    arguments: r#"{"a":1,"b":2}"#.to_string(),
                }],
            ),
            Message::tool("call_1", "add", "3"),
            Message::assistant("3"),
        ];

        let converted: Vec<_> = messages.iter().map(to_request_message).collect::<Result<_>>().unwrap();
        assert!(matches!(converted[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(converted[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(converted[3], ChatCompletionRequestMessage::Tool(_)));

        match &converted[2] {
            ChatCompletionRequestMessage::Assistant(a) => {
                let calls = a.tool_calls.as_ref().unwrap();
                assert_eq!(calls[0].function.name, "add");
                assert!(a.content.is_none());
            }
            other => panic!("Expected assistant message, got {:?}", other),
        }
    }

    #[test]
    fn test_describe_records_settings() {
        let model = OpenAIChatModel::new(&LlmSettings::default());
        let described = model.describe();
        assert_eq!(described["model"], "gpt-4o");
        assert_eq!(described["max_tokens"], 1024);
    }
}
