//! Remote tools over the MCP SSE transport.
//!
//! The server pushes every reply onto one long-lived event stream:
//! 1. client opens `GET {base}/sse`, server sends `event: endpoint` carrying
//!    the session id
//! 2. client POSTs JSON-RPC to `{base}/message?session_id=...`
//! 3. server sends the reply back as `event: message`, tagged with the id

use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::{Client, Url};
use reqwest_eventsource::{Event, EventSource};
use serde_json::Value;
use tokio::sync::Mutex;

use toolwire_core::config::RemoteConfig;
use toolwire_core::traits::ToolInvoker;
use toolwire_core::{CorrelationId, Error};

use crate::jsonrpc::JsonRpcRequest;
use crate::reply::match_reply;
use crate::tools::{parse_tool_list, ToolDefinition};

static SESSION_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:sessionId|session_id)=([^&\s"'#]+)"#).expect("session id pattern is valid")
});

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

impl SseFrame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// Decoded event stream owned by a session.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<SseFrame, Error>> + Send>>;

/// Find a session id in an event, in either supported encoding.
///
/// The id is either a `sessionId=` / `session_id=` query parameter inside
/// the data (the `endpoint` event) or a `sessionId` field of a JSON object.
/// Query parameter values are percent-decoded; they are encoded again when
/// the message URL is built.
pub fn extract_session_id(frame: &SseFrame) -> Option<String> {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&frame.data) {
        if let Some(id) = obj.get("sessionId").and_then(Value::as_str) {
            return Some(id.to_string());
        }
    }

    SESSION_PARAM
        .captures(&frame.data)
        .map(|caps| percent_decode_str(&caps[1]).decode_utf8_lossy().into_owned())
}

/// Read frames until one carries a session id.
///
/// # Errors
///
/// [`Error::NoSession`] if the stream ends or `timeout` passes first;
/// transport errors from the stream are propagated.
pub async fn await_session<S>(frames: &mut S, timeout: Duration) -> Result<String, Error>
where
    S: Stream<Item = Result<SseFrame, Error>> + Unpin,
{
    let scan = async {
        while let Some(frame) = frames.next().await {
            let frame = frame?;
            if let Some(id) = extract_session_id(&frame) {
                return Ok(id);
            }
            tracing::debug!(event = %frame.event, "skipping event before session id");
        }
        Err(Error::NoSession(
            "event stream ended before a session id arrived".to_string(),
        ))
    };

    tokio::time::timeout(timeout, scan)
        .await
        .map_err(|_| Error::NoSession(format!("no session id received within {timeout:?}")))?
}

/// Read frames until the reply to `id` arrives.
///
/// Frames that are not `message` events, whose data is not JSON, or that
/// answer other ids are skipped.
///
/// # Errors
///
/// [`Error::ToolInvocation`] if the reply carries an error,
/// [`Error::StreamClosed`] if the stream ends first and
/// [`Error::ReplyTimeout`] if `timeout` passes first.
pub async fn await_reply<S>(
    frames: &mut S,
    id: &CorrelationId,
    timeout: Duration,
) -> Result<Value, Error>
where
    S: Stream<Item = Result<SseFrame, Error>> + Unpin,
{
    let scan = async {
        while let Some(frame) = frames.next().await {
            let frame = frame?;
            if frame.event != "message" {
                tracing::debug!(event = %frame.event, "skipping non-message event");
                continue;
            }

            let message: Value = match serde_json::from_str(&frame.data) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("Failed to parse event data: {e}");
                    continue;
                }
            };

            if let Some(outcome) = match_reply(&message, id) {
                return outcome;
            }
            tracing::debug!(%id, "skipping unrelated message");
        }
        Err(Error::StreamClosed(id.clone()))
    };

    tokio::time::timeout(timeout, scan)
        .await
        .map_err(|_| Error::ReplyTimeout {
            id: id.clone(),
            timeout,
        })?
}

/// Opens sessions against one remote tool server.
#[derive(Debug, Clone)]
pub struct SseDispatcher {
    http: Client,
    config: RemoteConfig,
}

impl SseDispatcher {
    pub fn new(config: RemoteConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http: Client, config: RemoteConfig) -> Self {
        Self { http, config }
    }

    /// `{base}/sse?token=...[&actors=a,b]`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL does not parse.
    pub fn sse_url(&self) -> Result<Url, Error> {
        let mut params = vec![("token", self.config.token.clone())];
        if !self.config.actors.is_empty() {
            params.push(("actors", self.config.actors.join(",")));
        }
        self.url("sse", &params)
    }

    /// `{base}/message?token=...&session_id=...`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL does not parse.
    pub fn message_url(&self, session_id: &str) -> Result<Url, Error> {
        self.url(
            "message",
            &[
                ("token", self.config.token.clone()),
                ("session_id", session_id.to_string()),
            ],
        )
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, Error> {
        let base = format!("{}/{path}", self.config.base_url);
        Url::parse_with_params(&base, params)
            .map_err(|e| Error::Config(format!("invalid base url {base}: {e}")))
    }

    /// Open the event stream and wait for the session id.
    ///
    /// # Errors
    ///
    /// [`Error::NoSession`] if the stream ends or the handshake times out;
    /// transport and HTTP status errors if the connection fails.
    pub async fn connect_session(&self) -> Result<Session, Error> {
        let url = self.sse_url()?;
        tracing::info!(base = %self.config.base_url, "Connecting to SSE");

        let source = EventSource::new(self.http.get(url))
            .map_err(|e| Error::Transport(e.to_string()))?;
        let mut frames = frame_stream(source);

        let id = await_session(&mut frames, self.config.reply_timeout).await?;
        tracing::info!(session = %id, "SSE session established");

        Ok(Session::from_parts(
            id.clone(),
            self.message_url(&id)?,
            self.http.clone(),
            frames,
            self.config.reply_timeout,
        ))
    }
}

/// Adapt an [`EventSource`] into a stream of frames.
///
/// The source's automatic reconnect is never used: the first error closes
/// the stream.
pub fn frame_stream(source: EventSource) -> FrameStream {
    Box::pin(futures_util::stream::unfold(Some(source), |state| async move {
        let mut source = state?;
        loop {
            match source.next().await {
                Some(Ok(Event::Open)) => {
                    tracing::debug!("SSE connection open");
                }
                Some(Ok(Event::Message(msg))) => {
                    let frame = SseFrame::new(msg.event, msg.data);
                    return Some((Ok(frame), Some(source)));
                }
                Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                    source.close();
                    return None;
                }
                Some(Err(reqwest_eventsource::Error::InvalidStatusCode(status, resp))) => {
                    source.close();
                    let body = resp.text().await.unwrap_or_default();
                    let err = Error::HttpStatus {
                        status: status.as_u16(),
                        body,
                    };
                    return Some((Err(err), None));
                }
                Some(Err(err)) => {
                    source.close();
                    return Some((Err(Error::Transport(err.to_string())), None));
                }
            }
        }
    }))
}

/// An open event stream bound to one session id.
///
/// Calls are serialized: the stream lock is held from the POST until the
/// matching reply is read, so at most one call is outstanding.
pub struct Session {
    id: String,
    message_url: Url,
    http: Client,
    frames: Mutex<FrameStream>,
    timeout: Duration,
    next_id: AtomicI64,
}

impl Session {
    /// Build a session over an already established frame stream.
    pub fn from_parts(
        id: impl Into<String>,
        message_url: Url,
        http: Client,
        frames: FrameStream,
        timeout: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            message_url,
            http,
            frames: Mutex::new(frames),
            timeout,
            next_id: AtomicI64::new(1),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn message_url(&self) -> &Url {
        &self.message_url
    }

    /// Next id from the session's counter, starting at 1.
    pub fn next_correlation_id(&self) -> CorrelationId {
        CorrelationId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Invoke `tool` tagged with `id` and wait for its reply.
    ///
    /// # Errors
    ///
    /// [`Error::HttpStatus`] if the POST is rejected, then any error of
    /// [`await_reply`].
    pub async fn call(
        &self,
        tool: &str,
        arguments: Value,
        id: impl Into<CorrelationId>,
    ) -> Result<Value, Error> {
        let id = id.into();
        let request = JsonRpcRequest::tools_call(&id, tool, arguments);
        self.request(&request, &id).await
    }

    /// List the tools available in this session.
    ///
    /// # Errors
    ///
    /// As [`Session::call`], plus [`Error::MalformedReply`] if the result
    /// has no tool list.
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, Error> {
        let id = self.next_correlation_id();
        let request = JsonRpcRequest::new(&id, "tools/list", None);
        let result = self.request(&request, &id).await?;
        parse_tool_list(&result)
    }

    /// POST `request` and wait for its reply, all within the session timeout.
    async fn request(&self, request: &JsonRpcRequest, id: &CorrelationId) -> Result<Value, Error> {
        let mut frames = self.frames.lock().await;

        let exchange = async {
            tracing::info!(method = %request.method, %id, "[send]");
            let resp = self
                .http
                .post(self.message_url.clone())
                .json(request)
                .send()
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::HttpStatus {
                    status: status.as_u16(),
                    body,
                });
            }

            await_reply(&mut *frames, id, self.timeout).await
        };

        let result = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| Error::ReplyTimeout {
                id: id.clone(),
                timeout: self.timeout,
            })??;
        tracing::info!(%id, "[recv]");
        Ok(result)
    }
}

#[async_trait]
impl ToolInvoker for Session {
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, Error> {
        let id = self.next_correlation_id();
        self.call(name, arguments, id).await
    }
}
