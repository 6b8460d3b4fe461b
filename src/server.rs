//! HTTP surface
//!
//! Wires the SSE transport, the session engine and the chosen credential
//! checkpoint into one axum router.

use crate::config::{AuthMode, Config};
use crate::credential::CredentialVerifier;
use crate::error::{CredentialError, Result, TransportError};
use crate::middleware::AuthorizationLayer;
use crate::session::{run_session, ToolServer};
use crate::transport::{BearerSecretTransport, SessionTransport, SseTransport};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use futures::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

/// Path of the SSE handshake endpoint.
pub const SSE_PATH: &str = "/sse";

/// Path clients POST their JSON-RPC messages to.
pub const MESSAGES_PATH: &str = "/messages/";

#[derive(Clone)]
struct AppState {
    transport: Arc<dyn SessionTransport>,
    sse: SseTransport,
    server: Arc<dyn ToolServer>,
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

/// Build the router for `mode` with a fresh session registry.
pub fn build_router(
    mode: AuthMode,
    verifier: CredentialVerifier,
    server: Arc<dyn ToolServer>,
) -> Router {
    router_with_transport(mode, verifier, server, SseTransport::new(MESSAGES_PATH))
}

/// Build the router on top of an existing transport.
///
/// The transport's registry is shared, so callers can observe open sessions.
pub fn router_with_transport(
    mode: AuthMode,
    verifier: CredentialVerifier,
    server: Arc<dyn ToolServer>,
    sse: SseTransport,
) -> Router {
    let transport: Arc<dyn SessionTransport> = match mode {
        AuthMode::Gate => Arc::new(sse.clone()),
        AuthMode::Handshake => Arc::new(BearerSecretTransport::new(sse.clone(), verifier.clone())),
    };

    let state = AppState {
        transport,
        sse,
        server,
    };

    let router = Router::new()
        .route(SSE_PATH, get(handle_sse))
        .route(MESSAGES_PATH, post(handle_post_message))
        .with_state(state);

    match mode {
        AuthMode::Gate => router.layer(AuthorizationLayer::new(verifier)),
        AuthMode::Handshake => router,
    }
}

async fn handle_sse(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, CredentialError>
{
    let connection = state.transport.connect(&headers)?;
    let (streams, events) = connection.into_parts();

    tokio::spawn(run_session(state.server.clone(), streams));

    Ok(Sse::new(events.into_stream()).keep_alive(KeepAlive::default()))
}

async fn handle_post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<impl IntoResponse, TransportError> {
    let credential = state.transport.message_credential(&headers);

    state
        .sse
        .handle_post_message(query.session_id.as_deref(), credential, &body)
        .await?;

    Ok((StatusCode::ACCEPTED, "Accepted"))
}

/// Serve MCP over SSE until the listener fails.
pub async fn run_server(config: Config, server: Arc<dyn ToolServer>) -> Result<()> {
    let verifier = CredentialVerifier::new(config.auth_secret.clone());
    let app = build_router(config.auth_mode, verifier, server);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;

    tracing::info!(
        "MCP server listening on http://{}{} (auth mode: {})",
        listener.local_addr()?,
        SSE_PATH,
        config.auth_mode
    );

    axum::serve(listener, app).await?;

    tracing::info!("MCP server stopped");
    Ok(())
}
