use std::time::Duration;

use crate::error::Error;

/// Default wait for a correlated reply or a session handshake.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for a remote SSE tool server.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL without trailing slash, e.g. `https://actors-mcp-server.apify.actor`.
    pub base_url: String,
    pub token: String,
    /// Extra tools (actor ids) to load into the session.
    pub actors: Vec<String>,
    pub reply_timeout: Duration,
}

impl RemoteConfig {
    /// Build a config, rejecting a missing or blank token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `token` is absent or empty.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, Error> {
        Ok(Self {
            base_url: trim_base(base_url.into()),
            token: require("APIFY_TOKEN", token)?,
            actors: Vec::new(),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_actors(mut self, actors: Vec<String>) -> Self {
        self.actors = actors;
        self
    }

    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
}

/// Settings for an OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API root, e.g. `https://openrouter.ai/api/v1`.
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// Token cap for the follow-up completion after a tool call.
    pub max_tokens: u32,
}

impl LlmConfig {
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `api_key` is absent or empty.
    pub fn new(
        api_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, Error> {
        Ok(Self {
            api_url: trim_base(api_url.into()),
            api_key: require("OPENROUTER_API_KEY", api_key)?,
            model: model.into(),
            max_tokens: 1000,
        })
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Settings for the paginated dataset API.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// API root, e.g. `https://api.apify.com/v2`.
    pub api_url: String,
    pub token: String,
    pub page_size: usize,
}

impl DatasetConfig {
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `token` is absent or empty.
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Result<Self, Error> {
        Ok(Self {
            api_url: trim_base(api_url.into()),
            token: require("APIFY_TOKEN", token)?,
            page_size: 1000,
        })
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

fn require(name: &str, value: Option<String>) -> Result<String, Error> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
