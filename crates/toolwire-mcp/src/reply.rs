use serde_json::Value;

use toolwire_core::{CorrelationId, Error};

/// Classify a decoded message against the call waiting for `id`.
///
/// Returns `None` when the message is not the reply to `id` (another id, a
/// notification, or not an object). Otherwise the reply's `result` is
/// returned unchanged, or its `error` is raised.
pub fn match_reply(message: &Value, id: &CorrelationId) -> Option<Result<Value, Error>> {
    let reply = message.as_object()?;
    if !reply.get("id").is_some_and(|v| id.matches(v)) {
        return None;
    }

    if let Some(error) = reply.get("error") {
        return Some(Err(Error::ToolInvocation(error_message(error))));
    }

    Some(reply.get("result").cloned().ok_or_else(|| {
        Error::MalformedReply(format!("reply to call {id} has neither result nor error"))
    }))
}

fn error_message(error: &Value) -> String {
    match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}
