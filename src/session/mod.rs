//! MCP session engine
//!
//! Runs the JSON-RPC conversation of one authenticated session over the
//! stream pair handed out by a transport. Tools plug in through
//! [`ToolServer`]; they receive a [`ToolContext`] per call instead of reaching
//! into request state.

mod jsonrpc;

pub use jsonrpc::handle_message;

use crate::credential::{CredentialSource, TokenAccessor};
use crate::error::{CredentialError, ToolError};
use crate::transport::{SessionId, SessionStreams};
use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Pluggable tool server driven by the session engine
#[async_trait]
pub trait ToolServer: Send + Sync + 'static {
    /// Name reported in the `initialize` response.
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn list_tools(&self) -> Vec<Tool>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError>;
}

/// Execution context of one tool call
///
/// Carries the raw credential for the call: the header of the request that
/// delivered the message when the transport accepts one, otherwise the one
/// presented at handshake.
#[derive(Clone)]
pub struct ToolContext {
    session_id: SessionId,
    credential: Option<String>,
}

impl ToolContext {
    pub fn new(session_id: SessionId, credential: Option<String>) -> Self {
        Self {
            session_id,
            credential,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Decode this call's credential.
    pub fn tokens(&self) -> Result<TokenAccessor, CredentialError> {
        TokenAccessor::from_source(self)
    }
}

impl CredentialSource for ToolContext {
    fn raw_credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_id", &self.session_id)
            .field("has_credential", &self.credential.is_some())
            .finish()
    }
}

/// Serve one session until either side hangs up.
pub async fn run_session(server: Arc<dyn ToolServer>, streams: SessionStreams) {
    let SessionStreams {
        session_id,
        credential,
        mut inbound,
        outbound,
    } = streams;

    info!(%session_id, "MCP session started");

    while let Some(message) = inbound.recv().await {
        let ctx = ToolContext::new(
            session_id,
            message.credential.or_else(|| credential.clone()),
        );

        let Some(response) = handle_message(server.as_ref(), message.payload, &ctx).await else {
            continue;
        };

        if outbound.send(response).await.is_err() {
            debug!(%session_id, "client stream closed");
            break;
        }
    }

    info!(%session_id, "MCP session ended");
}
