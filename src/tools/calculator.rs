//! Integer addition tool

use super::schema;
use crate::error::ToolError;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde::Deserialize;
use serde_json::{json, Value};

pub const NAME: &str = "add_two_integers";

#[derive(Debug, Deserialize)]
struct AddArguments {
    a: i64,
    b: i64,
}

pub fn tool() -> Tool {
    Tool::new(
        NAME,
        "Add two integers together.",
        schema(json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {
                "a": { "type": "integer", "description": "The first integer." },
                "b": { "type": "integer", "description": "The second integer." }
            }
        })),
    )
}

pub fn call(arguments: JsonObject) -> Result<CallToolResult, ToolError> {
    let args: AddArguments = serde_json::from_value(Value::Object(arguments))
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

    let result = match args.a.checked_add(args.b) {
        Some(sum) => CallToolResult::success(vec![Content::text(sum.to_string())]),
        None => CallToolResult::error(vec![Content::text("Integer overflow")]),
    };
    Ok(result)
}
