//! Built-in tools
//!
//! A plain calculator and a connector-backed Gmail example, served through
//! [`BuiltinTools`].

pub mod calculator;
pub mod gmail;

pub use gmail::GmailClient;

use crate::error::ToolError;
use crate::session::{ToolContext, ToolServer};
use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use serde_json::Value;
use std::sync::Arc;

/// Turn a `json!` literal into a tool input schema.
fn schema(value: Value) -> Arc<JsonObject> {
    match value {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

/// The server's own tool set
#[derive(Clone, Debug)]
pub struct BuiltinTools {
    name: String,
    gmail: GmailClient,
}

impl BuiltinTools {
    pub fn new(name: impl Into<String>, gmail: GmailClient) -> Self {
        Self {
            name: name.into(),
            gmail,
        }
    }
}

#[async_trait]
impl ToolServer for BuiltinTools {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_tools(&self) -> Vec<Tool> {
        vec![calculator::tool(), gmail::tool()]
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        match name {
            calculator::NAME => calculator::call(arguments),
            gmail::NAME => gmail::call(&self.gmail, ctx).await,
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}
