//! Handshake-level credential check
//!
//! A streaming session sets up its duplex channel before any request
//! middleware would see a message, so for integration modes that talk to the
//! transport directly the check lives in session establishment itself.
//!
//! ```text
//! Unauthenticated ──(header valid)──▶ AuthenticatedStreaming ──▶ Closed
//!        │
//!        └──(missing/undecodable/wrong secret)──▶ Rejected
//! ```
//!
//! Trust is established once. A session that passed the handshake is never
//! re-authenticated, and credentials on later messages are ignored.

use super::sse::{SseConnection, SseTransport};
use super::SessionTransport;
use crate::credential::CredentialVerifier;
use crate::error::CredentialError;
use http::header::AUTHORIZATION;
use http::HeaderMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Where a session stands in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    AuthenticatedStreaming,
    Closed,
    Rejected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AuthenticatedStreaming => "authenticated_streaming",
            Self::Closed => "closed",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Wraps an [`SseTransport`] so that no session opens without a valid credential
#[derive(Clone, Debug)]
pub struct BearerSecretTransport {
    inner: SseTransport,
    verifier: CredentialVerifier,
}

impl BearerSecretTransport {
    pub fn new(inner: SseTransport, verifier: CredentialVerifier) -> Self {
        Self { inner, verifier }
    }
}

impl SessionTransport for BearerSecretTransport {
    fn connect(&self, headers: &HeaderMap) -> Result<SseConnection, CredentialError> {
        debug!(state = %SessionState::Unauthenticated, "handshake started");

        // Header values arrive as raw bytes at this layer.
        let raw = headers.get(AUTHORIZATION).map(|value| value.as_bytes());

        // Nothing is allocated before this check, so a rejection has nothing to release.
        if let Err(e) = self.verifier.authorize_bytes(raw) {
            warn!(reason = e.kind(), state = %SessionState::Rejected, "handshake refused");
            return Err(e);
        }

        let connection = self.inner.connect(headers)?;
        info!(
            session_id = %connection.session_id(),
            state = %SessionState::AuthenticatedStreaming,
            "handshake accepted"
        );
        Ok(connection)
    }

    /// The message endpoint has no checkpoint of its own in this mode, so a
    /// POST header is never trusted. Tools keep the handshake credential.
    fn message_credential(&self, _headers: &HeaderMap) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::codec::encode;
    use crate::credential::CredentialBundle;
    use http::HeaderValue;

    fn transport() -> (BearerSecretTransport, SseTransport) {
        let sessions = SseTransport::new("/messages/");
        let transport =
            BearerSecretTransport::new(sessions.clone(), CredentialVerifier::new("shh"));
        (transport, sessions)
    }

    fn headers_with(value: Option<&[u8]>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(bytes) = value {
            headers.insert(AUTHORIZATION, HeaderValue::from_bytes(bytes).unwrap());
        }
        headers
    }

    #[test]
    fn test_valid_handshake_opens_session() {
        let (transport, sessions) = transport();
        let header = encode(
            &CredentialBundle::new()
                .with_server_secret("shh")
                .with_connector_token("google", "g-tok"),
        );

        let connection =
            tokio_test::assert_ok!(transport.connect(&headers_with(Some(header.as_bytes()))));
        assert_eq!(sessions.session_count(), 1);

        let (streams, _events) = connection.into_parts();
        assert_eq!(streams.credential.as_deref(), Some(header.as_str()));
    }

    #[test]
    fn test_rejected_handshake_allocates_nothing() {
        let (transport, sessions) = transport();
        let wrong = encode(&CredentialBundle::new().with_server_secret("wrong"));
        let cases: [Option<&[u8]>; 5] = [
            None,
            Some(wrong.as_bytes()),
            Some(b"definitely-not-base64"),
            Some(b"bm90IGpzb24="),
            Some(&[0xe2, 0x82]),
        ];

        for case in cases {
            tokio_test::assert_err!(transport.connect(&headers_with(case)));
        }

        assert_eq!(sessions.session_count(), 0);
    }

    #[test]
    fn test_wrong_secret_is_secret_mismatch() {
        let (transport, _sessions) = transport();
        let wrong = encode(&CredentialBundle::new().with_server_secret("wrong"));

        match transport.connect(&headers_with(Some(wrong.as_bytes()))) {
            Err(CredentialError::SecretMismatch) => {}
            other => panic!("expected secret mismatch, got {:?}", other.map(|c| c.session_id())),
        }
    }

    #[test]
    fn test_message_headers_are_ignored() {
        let (transport, _sessions) = transport();
        let forged = encode(
            &CredentialBundle::new()
                .with_server_secret("wrong")
                .with_connector_token("google", "evil-tok"),
        );
        let headers = headers_with(Some(forged.as_bytes()));

        assert_eq!(transport.message_credential(&headers), None);
        assert_eq!(
            SseTransport::new("/messages/").message_credential(&headers),
            Some(forged)
        );
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(
            SessionState::AuthenticatedStreaming.to_string(),
            "authenticated_streaming"
        );
        assert_eq!(SessionState::Rejected.to_string(), "rejected");
    }
}
