use serde_json::Value;

use crate::args::parse_arguments;
use crate::error::Error;
use crate::traits::{ChatModel, ToolInvoker};
use crate::types::{ChatMessage, FunctionTool};

/// A chat history bound to a model and a tool backend.
///
/// Each query performs at most one tool round trip: if the model asks for
/// tools, only the first requested call is executed and the model is asked
/// once more to answer with the tool output in context.
pub struct Conversation<M, T> {
    model: M,
    invoker: T,
    tools: Vec<FunctionTool>,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

impl<M: ChatModel, T: ToolInvoker> Conversation<M, T> {
    pub fn new(model: M, invoker: T, tools: Vec<FunctionTool>, max_tokens: u32) -> Self {
        Self {
            model,
            invoker,
            tools,
            messages: Vec::new(),
            max_tokens,
        }
    }

    /// The full message history so far.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn tools(&self) -> &[FunctionTool] {
        &self.tools
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn invoker(&self) -> &T {
        &self.invoker
    }

    /// Give back the tool backend, e.g. to shut it down.
    pub fn into_invoker(self) -> T {
        self.invoker
    }

    /// Run one user query and return the final assistant text.
    ///
    /// # Errors
    ///
    /// Propagates model, argument-parse and tool errors. On failure the
    /// history is rolled back to where it was before the query, so no
    /// unanswered tool call is left behind.
    pub async fn process_query(&mut self, query: &str) -> Result<String, Error> {
        let checkpoint = self.messages.len();
        let outcome = self.run_query(query).await;
        if outcome.is_err() {
            self.messages.truncate(checkpoint);
        }
        outcome
    }

    async fn run_query(&mut self, query: &str) -> Result<String, Error> {
        self.messages.push(ChatMessage::user(query));

        let mut reply = self.model.complete(&self.messages, &self.tools, None).await?;
        if reply.tool_calls.len() > 1 {
            tracing::debug!(requested = reply.tool_calls.len(), "dropping extra tool calls");
            reply.tool_calls.truncate(1);
        }
        self.messages.push(reply.clone());

        let Some(call) = reply.tool_calls.first() else {
            return Ok(reply.content.unwrap_or_default());
        };

        let name = call.function.name.as_str();
        let arguments = parse_arguments(&call.function.arguments)?;
        tracing::info!(tool = name, "model requested tool call");

        let result = self.invoker.call_tool(name, arguments).await?;
        tracing::debug!(tool = name, %result, "tool result");

        self.messages
            .push(ChatMessage::tool(name, call.id.as_str(), tool_output_text(&result)));

        let followup = self
            .model
            .complete(&self.messages, &self.tools, Some(self.max_tokens))
            .await?;
        let text = followup.content.clone().unwrap_or_default();
        self.messages.push(followup);

        Ok(text)
    }
}

/// Flatten an MCP tool result into message text.
///
/// Text items of `content` are joined with newlines; anything else is sent
/// as its JSON text.
pub fn tool_output_text(result: &Value) -> String {
    let texts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if texts.is_empty() {
        result.to_string()
    } else {
        texts.join("\n")
    }
}
