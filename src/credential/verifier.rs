//! Shared-secret verification
//!
//! The single decode-and-check routine behind both enforcement points: the
//! request-level [`AuthorizationGate`](crate::middleware::AuthorizationGate)
//! and the handshake-level
//! [`BearerSecretTransport`](crate::transport::BearerSecretTransport).

use super::codec::{self, CredentialBundle};
use crate::error::CredentialError;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Checks credential headers against the configured server secret.
#[derive(Clone)]
pub struct CredentialVerifier {
    secret: Arc<str>,
}

impl CredentialVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::from(secret.into()),
        }
    }

    /// Compare a decoded bundle's secret with the configured one.
    ///
    /// An absent secret never matches, and an empty configured secret
    /// authorizes nobody.
    pub fn verify(&self, bundle: &CredentialBundle) -> Result<(), CredentialError> {
        if self.secret.is_empty() {
            return Err(CredentialError::SecretMismatch);
        }

        match bundle.server_secret() {
            Some(presented) if bool::from(presented.as_bytes().ct_eq(self.secret.as_bytes())) => {
                Ok(())
            }
            _ => Err(CredentialError::SecretMismatch),
        }
    }

    /// Decode and verify a header value.
    ///
    /// An empty header counts as missing and is never decoded.
    pub fn authorize(&self, header: Option<&str>) -> Result<CredentialBundle, CredentialError> {
        let raw = header
            .filter(|value| !value.is_empty())
            .ok_or(CredentialError::MissingHeader)?;

        let bundle = codec::decode(raw)?;
        self.verify(&bundle)?;
        Ok(bundle)
    }

    /// Same as [`authorize`](Self::authorize) for header values still in raw bytes.
    pub fn authorize_bytes(
        &self,
        header: Option<&[u8]>,
    ) -> Result<CredentialBundle, CredentialError> {
        let header = header
            .map(std::str::from_utf8)
            .transpose()
            .map_err(|_| CredentialError::InvalidHeader)?;

        self.authorize(header)
    }
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}
