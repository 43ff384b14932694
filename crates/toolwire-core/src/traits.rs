use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;
use crate::types::{ChatMessage, FunctionTool};

/// Something that can execute a named tool with JSON arguments.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke `name` and return the reply's `result` value unchanged.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, Error>;
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Request the next assistant message for `messages`.
    ///
    /// `tools` may be empty, in which case no tool schema is sent.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[FunctionTool],
        max_tokens: Option<u32>,
    ) -> Result<ChatMessage, Error>;
}
