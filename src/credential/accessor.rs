//! Connector token lookup for tool handlers
//!
//! Tools never see request objects. Their execution context implements
//! [`CredentialSource`], and [`TokenAccessor`] decodes that raw header for the
//! duration of one call. No secret check happens here; by the time a tool runs
//! the gate or the transport has already authorized the caller.

use super::codec::{self, CredentialBundle};
use crate::error::{CredentialError, MissingCredentialError};
use http::header::AUTHORIZATION;
use http::HeaderMap;

/// Capability that yields the raw credential header for the current call.
pub trait CredentialSource {
    fn raw_credential(&self) -> Option<&str>;
}

impl CredentialSource for HeaderMap {
    fn raw_credential(&self) -> Option<&str> {
        self.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
    }
}

/// Read-only view of the tokens carried by one call's credential.
#[derive(Debug)]
pub struct TokenAccessor {
    bundle: CredentialBundle,
}

impl TokenAccessor {
    /// Decode the credential exposed by `source`.
    pub fn from_source<S>(source: &S) -> Result<Self, CredentialError>
    where
        S: CredentialSource + ?Sized,
    {
        let raw = source
            .raw_credential()
            .filter(|value| !value.is_empty())
            .ok_or(CredentialError::MissingHeader)?;

        Ok(Self {
            bundle: codec::decode(raw)?,
        })
    }

    /// Access token for the named connector.
    pub fn connector_token(&self, name: &str) -> Result<&str, MissingCredentialError> {
        self.bundle
            .connector_token(name)
            .ok_or_else(|| MissingCredentialError {
                connector: name.to_string(),
            })
    }

    /// The caller's own token, if one was sent.
    pub fn primary_token(&self) -> Option<&str> {
        self.bundle.auth_token()
    }
}
