use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use toolwire_core::config::LlmConfig;
use toolwire_core::traits::ChatModel;
use toolwire_core::{ChatMessage, Error, FunctionTool};

/// Client for an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    config: LlmConfig,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http: Client, config: LlmConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Request one completion and return the first choice's message.
    ///
    /// # Errors
    ///
    /// [`Error::HttpStatus`] on a non-success status, [`Error::Transport`]
    /// if the API reports an error in the body, and
    /// [`Error::MalformedReply`] if no choice is returned.
    #[tracing::instrument(level = "info", skip_all, fields(model = %self.config.model))]
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[FunctionTool],
        max_tokens: Option<u32>,
    ) -> Result<ChatMessage, Error> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            tools,
            max_tokens,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        if let Some(error) = parsed.error {
            return Err(Error::Transport(format!("chat completion failed: {}", error.message)));
        }

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            Error::MalformedReply("chat completion returned no choices".to_string())
        })?;
        tracing::debug!(tool_calls = choice.message.tool_calls.len(), "completion received");
        Ok(choice.message)
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[FunctionTool],
        max_tokens: Option<u32>,
    ) -> Result<ChatMessage, Error> {
        self.chat(messages, tools, max_tokens).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [FunctionTool],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
