//! Streaming session transports
//!
//! [`SseTransport`] opens sessions unconditionally and is meant to sit behind
//! the request-level gate. [`BearerSecretTransport`] wraps it and performs the
//! credential check during the handshake instead.

pub mod handshake;
pub mod sse;

pub use handshake::{BearerSecretTransport, SessionState};
pub use sse::{
    InboundMessage, SessionEvents, SessionId, SessionStreams, SseConnection, SseTransport,
};

use crate::credential::CredentialSource;
use crate::error::CredentialError;
use http::HeaderMap;

/// Opens a session from the metadata of an incoming connection.
pub trait SessionTransport: Send + Sync {
    fn connect(&self, headers: &HeaderMap) -> Result<SseConnection, CredentialError>;

    /// Credential to attach to a message POSTed to an open session.
    ///
    /// `None` leaves tools on the credential presented at `connect`.
    fn message_credential(&self, headers: &HeaderMap) -> Option<String> {
        headers.raw_credential().map(str::to_owned)
    }
}
