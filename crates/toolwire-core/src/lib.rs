pub mod args;
pub mod config;
pub mod conversation;
pub mod error;
pub mod prompt;
pub mod traits;
pub mod types;

pub use conversation::Conversation;
pub use error::{ArgumentError, Error, Result};
pub use types::{ChatMessage, CorrelationId, FunctionTool, Role, ToolCall};
