//! Server-Sent Events session transport
//!
//! `GET /sse` opens a session: the first event (`endpoint`) tells the client
//! where to POST its JSON-RPC messages, every later event (`message`) carries
//! one server → client message. Messages POSTed to
//! `/messages/?session_id=<id>` are routed to the session's inbound channel.

use super::SessionTransport;
use crate::credential::CredentialSource;
use crate::error::{CredentialError, TransportError};
use axum::response::sse::Event;
use futures::stream::{self, Stream, StreamExt};
use http::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 32;

/// Identifier handed to the client in the `endpoint` event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Accepts both the 32-hex-digit form we emit and the hyphenated form.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// One client → server message plus the credential of the request that
/// delivered it
pub struct InboundMessage {
    pub payload: Value,
    pub credential: Option<String>,
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("payload", &self.payload)
            .field("has_credential", &self.credential.is_some())
            .finish()
    }
}

/// Server side of an established session: the duplex stream pair
pub struct SessionStreams {
    pub session_id: SessionId,
    /// Credential presented when the session was opened.
    pub credential: Option<String>,
    pub inbound: mpsc::Receiver<InboundMessage>,
    pub outbound: mpsc::Sender<Value>,
}

impl fmt::Debug for SessionStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStreams")
            .field("session_id", &self.session_id)
            .field("has_credential", &self.credential.is_some())
            .finish_non_exhaustive()
    }
}

/// Client side of an established session, turned into the SSE response body
#[derive(Debug)]
pub struct SessionEvents {
    endpoint: String,
    outbound: mpsc::Receiver<Value>,
    guard: SessionGuard,
}

impl SessionEvents {
    /// The `endpoint` event followed by one `message` event per outbound message.
    ///
    /// The session guard lives inside the stream, so the session is
    /// unregistered as soon as the client goes away and axum drops the body.
    pub fn into_stream(
        self,
    ) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        let SessionEvents {
            endpoint,
            outbound,
            guard,
        } = self;

        let first = Event::default().event("endpoint").data(endpoint);
        let messages = stream::unfold((outbound, guard), |(mut outbound, guard)| async move {
            let message = outbound.recv().await?;
            let event = Event::default().event("message").data(message.to_string());
            Some((Ok::<_, Infallible>(event), (outbound, guard)))
        });

        stream::once(async move { Ok::<_, Infallible>(first) }).chain(messages)
    }
}

/// A freshly opened session, not yet split between server and client halves
#[derive(Debug)]
pub struct SseConnection {
    streams: SessionStreams,
    events: SessionEvents,
}

impl SseConnection {
    pub fn session_id(&self) -> SessionId {
        self.streams.session_id
    }

    pub fn endpoint(&self) -> &str {
        &self.events.endpoint
    }

    pub fn into_parts(self) -> (SessionStreams, SessionEvents) {
        (self.streams, self.events)
    }
}

/// Removes the session from the registry when dropped
pub struct SessionGuard {
    session_id: SessionId,
    registry: SessionRegistry,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.session_id);
        info!(
            session_id = %self.session_id,
            state = %super::SessionState::Closed,
            "session closed"
        );
    }
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGuard")
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Live sessions by id. Holds only the inbound senders, never credentials.
#[derive(Clone, Default)]
struct SessionRegistry {
    inner: Arc<RwLock<HashMap<SessionId, mpsc::Sender<InboundMessage>>>>,
}

impl SessionRegistry {
    fn insert(&self, session_id: SessionId, sender: mpsc::Sender<InboundMessage>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id, sender);
    }

    fn remove(&self, session_id: &SessionId) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
    }

    fn sender(&self, session_id: &SessionId) -> Option<mpsc::Sender<InboundMessage>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Plain SSE transport, no credential check of its own
#[derive(Clone)]
pub struct SseTransport {
    endpoint: Arc<str>,
    sessions: SessionRegistry,
}

impl SseTransport {
    /// `endpoint` is the path clients POST messages to, e.g. `/messages/`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Arc::from(endpoint.into()),
            sessions: SessionRegistry::default(),
        }
    }

    /// Register a new session and allocate its stream pair.
    pub fn open_session(&self, credential: Option<String>) -> SseConnection {
        let session_id = SessionId::new();
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);

        self.sessions.insert(session_id, inbound_tx);
        let guard = SessionGuard {
            session_id,
            registry: self.sessions.clone(),
        };

        debug!(%session_id, "session registered");

        SseConnection {
            streams: SessionStreams {
                session_id,
                credential,
                inbound: inbound_rx,
                outbound: outbound_tx,
            },
            events: SessionEvents {
                endpoint: format!("{}?session_id={}", self.endpoint, session_id),
                outbound: outbound_rx,
                guard,
            },
        }
    }

    /// Route one POSTed message to its session.
    pub async fn handle_post_message(
        &self,
        session_id: Option<&str>,
        credential: Option<String>,
        body: &[u8],
    ) -> Result<(), TransportError> {
        let raw_id = session_id.ok_or(TransportError::MissingSessionId)?;
        let session_id = SessionId::parse(raw_id).ok_or(TransportError::InvalidSessionId)?;
        let sender = self
            .sessions
            .sender(&session_id)
            .ok_or(TransportError::UnknownSession)?;

        let payload: Value = serde_json::from_slice(body)?;

        sender
            .send(InboundMessage {
                payload,
                credential,
            })
            .await
            .map_err(|_| TransportError::SessionClosed)?;

        debug!(%session_id, "message accepted");
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl SessionTransport for SseTransport {
    fn connect(&self, headers: &HeaderMap) -> Result<SseConnection, CredentialError> {
        let credential = headers.raw_credential().map(str::to_owned);
        Ok(self.open_session(credential))
    }
}

impl fmt::Debug for SseTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseTransport")
            .field("endpoint", &self.endpoint)
            .field("sessions", &self.session_count())
            .finish()
    }
}
