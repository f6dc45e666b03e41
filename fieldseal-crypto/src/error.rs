//! Error types for the cryptographic layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised by the AEAD primitive and the security utilities.
///
/// None of these are retryable: they indicate tampering, a wrong key or a
/// caller bug, and must reach the caller unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid ciphertext format: {0}")]
    InvalidCiphertextFormat(String),

    #[error("authentication tag mismatch (wrong key or tampered ciphertext)")]
    AuthenticationFailed,

    #[error("invalid PKCS#7 padding")]
    InvalidPadding,

    #[error("algorithm version mismatch: key uses {expected:#04x}, ciphertext has {actual:#04x}")]
    VersionMismatch { expected: u8, actual: u8 },

    #[error("output buffer of {requested} bytes exceeds the {available}-byte digest")]
    BufferTooSmall { requested: usize, available: usize },

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("unsupported encryption algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("random number generation failed: {0}")]
    Rng(String),
}
