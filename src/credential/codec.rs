//! Credential blob encoding
//!
//! Wire format: standard-alphabet base64 of a UTF-8 JSON object
//! `{"auth_token": .., "connector_access_tokens": {..}, "server_secret": ..}`.
//! The whole header value is the blob; no scheme prefix is stripped.

use crate::error::CredentialError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;

const REDACTED: &str = "<redacted>";

/// Decoded form of the credential header
///
/// Fields are private: a bundle is read-only once decoded and is meant to be
/// dropped with the request or session it came from.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CredentialBundle {
    #[serde(default)]
    auth_token: Option<String>,
    #[serde(default)]
    connector_access_tokens: HashMap<String, String>,
    #[serde(default)]
    server_secret: Option<String>,
}

impl CredentialBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server_secret(mut self, secret: impl Into<String>) -> Self {
        self.server_secret = Some(secret.into());
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_connector_token(
        mut self,
        connector: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.connector_access_tokens
            .insert(connector.into(), token.into());
        self
    }

    pub fn server_secret(&self) -> Option<&str> {
        self.server_secret.as_deref()
    }

    /// The end-user token, opaque to this layer.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn connector_token(&self, connector: &str) -> Option<&str> {
        self.connector_access_tokens.get(connector).map(String::as_str)
    }

    /// Connector names in sorted order.
    pub fn connector_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .connector_access_tokens
            .keys()
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("auth_token", &self.auth_token.as_ref().map(|_| REDACTED))
            .field("connectors", &self.connector_names())
            .field("server_secret", &self.server_secret.as_ref().map(|_| REDACTED))
            .finish()
    }
}

/// Decode a raw header value into a bundle.
///
/// Absent optional fields default to `None`/empty; unknown fields are ignored.
pub fn decode(raw: &str) -> Result<CredentialBundle, CredentialError> {
    let bytes = STANDARD.decode(raw)?;
    let text = String::from_utf8(bytes)?;

    // serde would also accept a positional array for the struct
    let value: serde_json::Value = serde_json::from_str(&text)?;
    if !value.is_object() {
        return Err(CredentialError::Json(serde::de::Error::custom(
            "credential must be a JSON object",
        )));
    }

    Ok(serde_json::from_value(value)?)
}

/// Encode a bundle into a header value.
pub fn encode(bundle: &CredentialBundle) -> String {
    let value = json!({
        "auth_token": bundle.auth_token,
        "connector_access_tokens": bundle.connector_access_tokens,
        "server_secret": bundle.server_secret,
    });
    STANDARD.encode(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(text: &str) -> String {
        STANDARD.encode(text)
    }

    #[test]
    fn test_decode_connector_tokens() {
        let raw = b64(r#"{"server_secret":"shh","connector_access_tokens":{"google":"g-tok"}}"#);
        let bundle = decode(&raw).unwrap();

        assert_eq!(bundle.server_secret(), Some("shh"));
        assert_eq!(bundle.connector_token("google"), Some("g-tok"));
        assert_eq!(bundle.connector_token("slack"), None);
        assert_eq!(bundle.auth_token(), None);
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let bundle = decode(&b64("{}")).unwrap();
        assert_eq!(bundle, CredentialBundle::new());

        let bundle = decode(&b64(r#"{"auth_token":null,"server_secret":null}"#)).unwrap();
        assert_eq!(bundle.server_secret(), None);
        assert!(bundle.connector_names().is_empty());
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let bundle = decode(&b64(r#"{"server_secret":"s","extra":[1,2,3]}"#)).unwrap();
        assert_eq!(bundle.server_secret(), Some("s"));
    }

    #[test]
    fn test_round_trip() {
        let bundles = [
            CredentialBundle::new(),
            CredentialBundle::new().with_server_secret("shh"),
            CredentialBundle::new().with_auth_token("user-token"),
            CredentialBundle::new()
                .with_server_secret("shh")
                .with_auth_token("user-token")
                .with_connector_token("google", "g-tok")
                .with_connector_token("slack", "s-tok")
                .with_connector_token("", "empty-name"),
            CredentialBundle::new().with_connector_token("ünïcode", "tök\"en"),
        ];

        for bundle in bundles {
            assert_eq!(decode(&encode(&bundle)).unwrap(), bundle);
        }
    }

    #[test]
    fn test_encode_emits_nulls() {
        let raw = encode(&CredentialBundle::new());
        let text = String::from_utf8(STANDARD.decode(raw).unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert!(value["auth_token"].is_null());
        assert!(value["server_secret"].is_null());
        assert_eq!(value["connector_access_tokens"], json!({}));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode("not base64 at all!").unwrap_err();
        assert!(matches!(err, CredentialError::Base64(_)));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let raw = STANDARD.encode([0xff, 0xfe, 0x00]);
        let err = decode(&raw).unwrap_err();
        assert!(matches!(err, CredentialError::Utf8(_)));
    }

    #[test]
    fn test_decode_rejects_schema_violations() {
        for body in [
            "not json",
            "[]",
            r#"[null, {}, "shh"]"#,
            r#""just a string""#,
            r#"{"connector_access_tokens":{"google":42}}"#,
            r#"{"connector_access_tokens":null}"#,
            r#"{"server_secret":123}"#,
        ] {
            let err = decode(&b64(body)).unwrap_err();
            assert!(err.is_decode_error(), "expected decode error for {}", body);
        }
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let bundle = CredentialBundle::new()
            .with_server_secret("super-secret")
            .with_auth_token("user-token")
            .with_connector_token("google", "g-tok");

        let rendered = format!("{:?}", bundle);
        assert!(rendered.contains("google"));
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("user-token"));
        assert!(!rendered.contains("g-tok"));
    }
}
