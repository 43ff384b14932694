use std::time::Duration;

use crate::types::CorrelationId;

/// Core error type for toolwire clients.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing configuration: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("tool invocation failed: {0}")]
    ToolInvocation(String),

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    #[error("no session established: {0}")]
    NoSession(String),

    #[error("event stream closed before a reply to call {0} arrived")]
    StreamClosed(CorrelationId),

    #[error("no reply to call {id} within {timeout:?}")]
    ReplyTimeout { id: CorrelationId, timeout: Duration },

    #[error("unsupported server script: {0} (expected a .py or .js file)")]
    UnsupportedServer(String),

    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of the two-stage tool-argument parse.
#[derive(Debug, thiserror::Error)]
pub enum ArgumentError {
    /// The raw string is not JSON and holds no embedded object.
    #[error("tool arguments are not valid JSON: {0}")]
    Strict(#[source] serde_json::Error),

    /// An embedded object was found but it does not parse either.
    #[error("embedded object in tool arguments is not valid JSON: {0}")]
    Salvage(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
