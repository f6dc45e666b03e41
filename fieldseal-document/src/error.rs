//! Document processing error types.

use fieldseal_keys::KeyError;
use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("path not found in document: {0}")]
    PathNotFound(String),

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Decrypting a recorded path failed. Carries enough context for a
    /// caller to skip, log or abort: the path, the DEK id and the
    /// ciphertext exactly as stored.
    #[error("failed to decrypt {path} with data encryption key {dek_id}: {source}")]
    DecryptionFailed {
        path: String,
        dek_id: String,
        encrypted: Vec<u8>,
        source: DecryptionFailure,
    },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("unsupported encryption format version {0}")]
    UnsupportedFormatVersion(u32),

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a recorded path could not be restored.
#[derive(Debug, Error)]
pub enum DecryptionFailure {
    /// Key resolution or authenticated decryption failed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The plaintext authenticated but is not the expected JSON.
    #[error("decrypted plaintext is not valid JSON: {0}")]
    Plaintext(#[from] serde_json::Error),
}

impl DocumentError {
    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
