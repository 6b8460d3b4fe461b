//! JSON-RPC dispatch for MCP methods

use super::{ToolContext, ToolServer};
use crate::error::ToolError;
use rmcp::model::{CallToolResult, Content, JsonObject};
use serde_json::{json, Value};
use tracing::{debug, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";

const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

fn error_response(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message.into()
        },
        "id": id
    })
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id
    })
}

/// Handle one inbound payload. Returns the response to send, if any.
///
/// Notifications and client responses produce nothing; batches produce an
/// array of the individual responses.
pub async fn handle_message(
    server: &dyn ToolServer,
    payload: Value,
    ctx: &ToolContext,
) -> Option<Value> {
    match payload {
        Value::Array(batch) => {
            if batch.is_empty() {
                return Some(error_response(Value::Null, INVALID_REQUEST, "Empty batch"));
            }

            let mut responses = Vec::new();
            for message in batch {
                if let Some(response) = handle_single(server, message, ctx).await {
                    responses.push(response);
                }
            }

            (!responses.is_empty()).then_some(Value::Array(responses))
        }
        message => handle_single(server, message, ctx).await,
    }
}

async fn handle_single(
    server: &dyn ToolServer,
    message: Value,
    ctx: &ToolContext,
) -> Option<Value> {
    let Value::Object(mut message) = message else {
        warn!("Invalid JSON-RPC message: not an object");
        return Some(error_response(Value::Null, INVALID_REQUEST, "Invalid Request"));
    };

    let id = message.remove("id");
    let method = match message.remove("method") {
        Some(Value::String(method)) => method,
        Some(_) => {
            return Some(error_response(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "Invalid Request",
            ))
        }
        None => {
            // A response to a server-initiated request; nothing to answer.
            debug!("Ignoring JSON-RPC response from client");
            return None;
        }
    };

    let Some(id) = id else {
        debug!(%method, "Received notification");
        return None;
    };

    let params = match message.remove("params") {
        None | Some(Value::Null) => JsonObject::new(),
        Some(Value::Object(params)) => params,
        Some(_) => return Some(error_response(id, INVALID_PARAMS, "params must be an object")),
    };

    debug!(%method, session_id = %ctx.session_id(), "Handling request");

    let outcome = match method.as_str() {
        "initialize" => Ok(initialize(server, &params)),
        "ping" => Ok(json!({})),
        "tools/list" => list_tools(server),
        "tools/call" => call_tool(server, params, ctx).await,
        _ => Err((METHOD_NOT_FOUND, format!("Method not found: {}", method))),
    };

    Some(match outcome {
        Ok(result) => success_response(id, result),
        Err((code, message)) => error_response(id, code, message),
    })
}

fn initialize(server: &dyn ToolServer, params: &JsonObject) -> Value {
    let requested = params.get("protocolVersion").and_then(Value::as_str);
    let version = requested
        .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
        .unwrap_or(PROTOCOL_VERSION);

    json!({
        "protocolVersion": version,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": server.name(),
            "version": server.version()
        }
    })
}

fn list_tools(server: &dyn ToolServer) -> Result<Value, (i64, String)> {
    let tools = serde_json::to_value(server.list_tools())
        .map_err(|e| (INTERNAL_ERROR, format!("Failed to encode tools: {}", e)))?;
    Ok(json!({ "tools": tools }))
}

async fn call_tool(
    server: &dyn ToolServer,
    mut params: JsonObject,
    ctx: &ToolContext,
) -> Result<Value, (i64, String)> {
    let name = match params.remove("name") {
        Some(Value::String(name)) => name,
        _ => return Err((INVALID_PARAMS, "Tool name is required".to_string())),
    };

    let arguments = match params.remove("arguments") {
        None | Some(Value::Null) => JsonObject::new(),
        Some(Value::Object(arguments)) => arguments,
        Some(_) => return Err((INVALID_PARAMS, "Tool arguments must be an object".to_string())),
    };

    let result = match server.call_tool(&name, arguments, ctx).await {
        Ok(result) => result,
        Err(e @ (ToolError::UnknownTool(_) | ToolError::InvalidArguments(_))) => {
            return Err((INVALID_PARAMS, e.to_string()));
        }
        Err(e) => {
            // Execution failures go back to the model as a tool error result.
            warn!(tool = %name, error = %e, "Tool call failed");
            CallToolResult::error(vec![Content::text(e.to_string())])
        }
    };

    serde_json::to_value(result)
        .map_err(|e| (INTERNAL_ERROR, format!("Failed to encode tool result: {}", e)))
}
