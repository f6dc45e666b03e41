//! Key lifecycle error types.

use fieldseal_crypto::CryptoError;
use thiserror::Error;

/// Result type for key operations.
pub type KeyResult<T> = Result<T, KeyError>;

/// Errors raised while creating, wrapping, unwrapping or resolving data
/// encryption keys.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to resolve data encryption key {id}: {reason}")]
    KeyResolutionFailed { id: String, reason: String },

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("unsupported key wrap metadata: {0}")]
    UnsupportedWrapMetadata(String),

    #[error("key protection policy violation: {0}")]
    PolicyViolation(String),

    #[error("data encryption key not found: {0}")]
    DekNotFound(String),

    #[error("data encryption key already exists: {0}")]
    DekAlreadyExists(String),

    #[error("etag mismatch for data encryption key {0}")]
    PreconditionFailed(String),

    #[error("key wrap provider error: {0}")]
    Provider(String),

    #[error("key store error: {0}")]
    Storage(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl KeyError {
    pub(crate) fn resolution(id: &str, reason: impl Into<String>) -> Self {
        Self::KeyResolutionFailed {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
