//! Local tools over the MCP stdio transport.
//!
//! The server is a child process; requests and replies are single JSON
//! lines on its stdin and stdout.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use toolwire_core::traits::ToolInvoker;
use toolwire_core::{CorrelationId, Error};

use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, PROTOCOL_VERSION};
use crate::reply::match_reply;
use crate::tools::{parse_tool_list, ToolDefinition};

/// How long `shutdown` waits for the child to exit after stdin closes.
const EXIT_GRACE: Duration = Duration::from_secs(5);

struct LineIo<W, R> {
    writer: W,
    lines: Lines<R>,
}

/// A JSON-RPC peer speaking newline-delimited JSON.
pub struct McpPeer<W, R> {
    io: Mutex<LineIo<W, R>>,
    next_id: AtomicI64,
    timeout: Duration,
}

impl<W, R> McpPeer<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(writer: W, reader: R, timeout: Duration) -> Self {
        Self {
            io: Mutex::new(LineIo {
                writer,
                lines: reader.lines(),
            }),
            next_id: AtomicI64::new(1),
            timeout,
        }
    }

    /// Run the `initialize` handshake and return the server's reply.
    ///
    /// # Errors
    ///
    /// Propagates I/O, protocol and timeout errors.
    pub async fn initialize(&self) -> Result<Value, Error> {
        let info = self
            .request(
                "initialize",
                Some(serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "toolwire",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
            )
            .await?;

        self.notify(&JsonRpcNotification::new("notifications/initialized"))
            .await?;

        if let Some(server) = info.get("serverInfo") {
            tracing::info!(%server, "MCP server initialized");
        }
        Ok(info)
    }

    /// # Errors
    ///
    /// Propagates I/O, protocol and timeout errors, or
    /// [`Error::MalformedReply`] if the result has no tool list.
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, Error> {
        let result = self.request("tools/list", None).await?;
        parse_tool_list(&result)
    }

    /// Invoke a tool and return the reply's `result`.
    ///
    /// # Errors
    ///
    /// [`Error::ToolInvocation`] if the server answers with an error.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, Error> {
        let id = self.next_correlation_id();
        let request = JsonRpcRequest::tools_call(&id, name, arguments);
        self.send_and_wait(&request, &id).await
    }

    fn next_correlation_id(&self) -> CorrelationId {
        CorrelationId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        let id = self.next_correlation_id();
        let request = JsonRpcRequest::new(&id, method, params);
        self.send_and_wait(&request, &id).await
    }

    async fn notify(&self, notification: &JsonRpcNotification) -> Result<(), Error> {
        let mut io = self.io.lock().await;
        write_line(&mut io.writer, notification).await
    }

    async fn send_and_wait(
        &self,
        request: &JsonRpcRequest,
        id: &CorrelationId,
    ) -> Result<Value, Error> {
        let mut io = self.io.lock().await;
        tracing::debug!(method = %request.method, %id, "[send]");
        write_line(&mut io.writer, request).await?;

        tokio::time::timeout(self.timeout, read_reply(&mut io.lines, id))
            .await
            .map_err(|_| Error::ReplyTimeout {
                id: id.clone(),
                timeout: self.timeout,
            })?
    }
}

async fn write_line<W, T>(writer: &mut W, message: &T) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_reply<R>(lines: &mut Lines<R>, id: &CorrelationId) -> Result<Value, Error>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message: Value = match serde_json::from_str(line) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Failed to parse server output: {e}");
                continue;
            }
        };

        if let Some(outcome) = match_reply(&message, id) {
            return outcome;
        }
        tracing::debug!(%id, "skipping unrelated message");
    }
    Err(Error::StreamClosed(id.clone()))
}

#[async_trait]
impl<W, R> ToolInvoker for McpPeer<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncBufRead + Unpin + Send,
{
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, Error> {
        McpPeer::call_tool(self, name, arguments).await
    }
}

/// Interpreter for a server script, chosen by extension.
///
/// # Errors
///
/// [`Error::UnsupportedServer`] unless the path ends in `.py` or `.js`.
pub fn interpreter_for(script: &Path) -> Result<&'static str, Error> {
    match script.extension().and_then(|e| e.to_str()) {
        Some("py") => Ok("python"),
        Some("js") => Ok("node"),
        _ => Err(Error::UnsupportedServer(script.display().to_string())),
    }
}

/// A spawned MCP server and the peer talking to it.
///
/// The child is killed if the client is dropped without [`shutdown`].
///
/// [`shutdown`]: StdioClient::shutdown
pub struct StdioClient {
    child: Child,
    peer: McpPeer<ChildStdin, BufReader<ChildStdout>>,
}

impl StdioClient {
    /// Spawn the server script and run the `initialize` handshake.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedServer`] for unknown script types, I/O errors
    /// if the process cannot start, and any handshake error.
    pub async fn spawn(script: &Path, timeout: Duration) -> Result<Self, Error> {
        let program = interpreter_for(script)?;
        tracing::info!(program, script = %script.display(), "starting MCP server");

        let mut child = Command::new(program)
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Transport("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Transport("child stdout unavailable".to_string()))?;

        let client = Self {
            child,
            peer: McpPeer::new(stdin, BufReader::new(stdout), timeout),
        };
        client.peer.initialize().await?;
        Ok(client)
    }

    pub fn peer(&self) -> &McpPeer<ChildStdin, BufReader<ChildStdout>> {
        &self.peer
    }

    /// Close stdin, give the server a moment to exit, then kill it.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from waiting on or killing the child.
    pub async fn shutdown(self) -> Result<(), Error> {
        let Self { mut child, peer } = self;
        drop(peer);

        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::info!(%status, "MCP server exited");
            }
            Err(_) => {
                tracing::warn!("MCP server did not exit, killing it");
                child.kill().await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ToolInvoker for StdioClient {
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, Error> {
        self.peer.call_tool(name, arguments).await
    }
}
