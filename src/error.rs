//! Error types for the authful MCP server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Process-level failures (startup, listener, outbound HTTP).
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("MCP error: {0}")]
    Mcp(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Reasons a credential header is refused.
///
/// Decode failures (`InvalidHeader`, `Base64`, `Utf8`, `Json`) and validation
/// failures (`SecretMismatch`) stay distinct so callers can log them apart, but
/// every variant ends in the same 401 at the HTTP boundary.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Authorization header missing")]
    MissingHeader,

    #[error("Authorization header is not valid text")]
    InvalidHeader,

    #[error("Credential is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Credential is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Credential does not match the bundle schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server secret mismatch")]
    SecretMismatch,
}

impl CredentialError {
    /// True when the header was present but could not be decoded into a bundle.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidHeader | Self::Base64(_) | Self::Utf8(_) | Self::Json(_)
        )
    }

    /// Short label safe to put in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::SecretMismatch => "secret_mismatch",
            _ => "decode_failure",
        }
    }
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        // Decode details stay in the log, the client only learns it was refused.
        let message = match &self {
            Self::MissingHeader => "Authorization header missing",
            _ => "Invalid authorization token",
        };

        tracing::warn!(reason = self.kind(), "rejected unauthorized request");
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
    }
}

/// A tool asked for a connector the caller did not supply a token for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No access token supplied for connector '{connector}'")]
pub struct MissingCredentialError {
    pub connector: String,
}

/// Failures raised while executing a tool call.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    MissingCredential(#[from] MissingCredentialError),

    #[error("Credential unavailable: {0}")]
    Credential(#[from] CredentialError),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] ServerError),
}

/// Failures on the message endpoint of the SSE transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("session_id is required")]
    MissingSessionId,

    #[error("Invalid session ID")]
    InvalidSessionId,

    #[error("Could not find session")]
    UnknownSession,

    #[error("Session closed")]
    SessionClosed,

    #[error("Could not parse message: {0}")]
    InvalidMessage(#[from] serde_json::Error),
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingSessionId | Self::InvalidSessionId | Self::InvalidMessage(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UnknownSession => StatusCode::NOT_FOUND,
            Self::SessionClosed => StatusCode::GONE,
        };

        tracing::debug!(%status, error = %self, "message rejected");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_errors_are_distinguished() {
        assert!(CredentialError::InvalidHeader.is_decode_error());
        assert!(!CredentialError::MissingHeader.is_decode_error());
        assert!(!CredentialError::SecretMismatch.is_decode_error());

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(CredentialError::from(json_err).is_decode_error());
    }

    #[test]
    fn test_credential_errors_map_to_401() {
        for err in [
            CredentialError::MissingHeader,
            CredentialError::InvalidHeader,
            CredentialError::SecretMismatch,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_transport_error_statuses() {
        assert_eq!(
            TransportError::UnknownSession.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TransportError::InvalidSessionId.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TransportError::SessionClosed.into_response().status(),
            StatusCode::GONE
        );
    }

    #[test]
    fn test_missing_credential_message_names_connector() {
        let err = MissingCredentialError {
            connector: "slack".to_string(),
        };
        assert!(err.to_string().contains("slack"));
    }
}
