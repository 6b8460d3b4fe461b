//! Multiplexed bearer credential
//!
//! One `Authorization` header value carries both the shared secret that
//! authenticates the calling application and the per-connector access tokens
//! tools use to reach third-party APIs on the caller's behalf.

pub mod accessor;
pub mod codec;
pub mod verifier;

pub use accessor::{CredentialSource, TokenAccessor};
pub use codec::CredentialBundle;
pub use verifier::CredentialVerifier;
