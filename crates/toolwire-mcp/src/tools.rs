use serde::{Deserialize, Serialize};
use serde_json::Value;

use toolwire_core::FunctionTool;

/// Definition of a tool as listed by an MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Option<Value>,
}

impl ToolDefinition {
    /// Convert to the function-tool schema chat models accept.
    ///
    /// Only `properties` and `required` are carried over; the parameters
    /// object is always `"type": "object"`.
    pub fn to_function_tool(&self) -> FunctionTool {
        let schema = self.input_schema.as_ref();
        let properties = schema
            .and_then(|s| s.get("properties"))
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let required = schema
            .and_then(|s| s.get("required"))
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));

        FunctionTool::new(
            self.name.clone(),
            self.description.clone().unwrap_or_default(),
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        )
    }
}

/// Decode the `tools` array of a `tools/list` result.
///
/// # Errors
///
/// Returns an error if `tools` is missing or not a list of definitions.
pub fn parse_tool_list(result: &Value) -> Result<Vec<ToolDefinition>, toolwire_core::Error> {
    let tools = result.get("tools").cloned().ok_or_else(|| {
        toolwire_core::Error::MalformedReply("tools/list result has no 'tools' field".to_string())
    })?;
    Ok(serde_json::from_value(tools)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_copies_schema_parts() {
        let tool: ToolDefinition = serde_json::from_value(serde_json::json!({
            "name": "send_message",
            "description": "Send a message",
            "inputSchema": {
                "type": "object",
                "properties": {"to": {"type": "string"}},
                "required": ["to"],
                "additionalProperties": false
            }
        }))
        .unwrap();

        let func = tool.to_function_tool();
        assert_eq!(func.kind, "function");
        assert_eq!(func.function.name, "send_message");
        assert_eq!(func.function.description, "Send a message");
        assert_eq!(func.function.parameters["type"], "object");
        assert_eq!(func.function.parameters["properties"]["to"]["type"], "string");
        assert_eq!(func.function.parameters["required"][0], "to");
        assert!(func.function.parameters.get("additionalProperties").is_none());
    }

    #[test]
    fn missing_schema_defaults_to_empty() {
        let tool: ToolDefinition =
            serde_json::from_value(serde_json::json!({"name": "lookup"})).unwrap();

        let func = tool.to_function_tool();
        assert_eq!(func.function.description, "");
        assert_eq!(func.function.parameters["properties"], serde_json::json!({}));
        assert_eq!(func.function.parameters["required"], serde_json::json!([]));
    }

    #[test]
    fn tool_list_parses() {
        let result = serde_json::json!({
            "tools": [
                {"name": "a", "inputSchema": {"type": "object"}},
                {"name": "b", "description": "second"}
            ]
        });
        let tools = parse_tool_list(&result).unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn tool_list_without_tools_is_malformed() {
        let err = parse_tool_list(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, toolwire_core::Error::MalformedReply(_)));
    }
}
