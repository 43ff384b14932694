pub mod jsonrpc;
pub mod reply;
pub mod sse;
pub mod stdio;
pub mod tools;

pub use jsonrpc::{JsonRpcNotification, JsonRpcRequest};
pub use sse::{Session, SseDispatcher, SseFrame};
pub use stdio::{McpPeer, StdioClient};
pub use tools::ToolDefinition;
