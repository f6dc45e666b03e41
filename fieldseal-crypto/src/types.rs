//! Encryption modes and algorithm identifiers.

use crate::error::{CryptoError, CryptoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the AEAD primitive chooses its IV.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncryptionType {
    /// Fresh random IV per call; identical plaintexts encrypt differently.
    Randomized,
    /// IV derived from the plaintext; identical plaintexts encrypt identically,
    /// which allows equality predicates over ciphertext.
    Deterministic,
    /// No transformation.
    Plaintext,
}

/// Algorithms a data encryption key can be declared with.
///
/// The algorithm name fixes the [`EncryptionType`] used by that key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EncryptionAlgorithm {
    AeadAes256CbcHmacSha256Randomized,
    AeadAes256CbcHmacSha256Deterministic,
}

impl EncryptionAlgorithm {
    /// Legacy name, always randomized.
    pub const AEAD_AES_256_CBC_HMAC_SHA256: &'static str = "AEAD_AES_256_CBC_HMAC_SHA256";
    pub const AEAD_AES_256_CBC_HMAC_SHA256_RANDOMIZED: &'static str =
        "AEAD_AES_256_CBC_HMAC_SHA256_RANDOMIZED";
    pub const AEAD_AES_256_CBC_HMAC_SHA256_DETERMINISTIC: &'static str =
        "AEAD_AES_256_CBC_HMAC_SHA256_DETERMINISTIC";

    /// Canonical name written into DEK records and envelopes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AeadAes256CbcHmacSha256Randomized => Self::AEAD_AES_256_CBC_HMAC_SHA256_RANDOMIZED,
            Self::AeadAes256CbcHmacSha256Deterministic => {
                Self::AEAD_AES_256_CBC_HMAC_SHA256_DETERMINISTIC
            }
        }
    }

    pub fn encryption_type(&self) -> EncryptionType {
        match self {
            Self::AeadAes256CbcHmacSha256Randomized => EncryptionType::Randomized,
            Self::AeadAes256CbcHmacSha256Deterministic => EncryptionType::Deterministic,
        }
    }

    /// Raw root key length required by the algorithm.
    pub fn key_length(&self) -> usize {
        crate::key::KEY_SIZE
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> CryptoResult<Self> {
        match s {
            Self::AEAD_AES_256_CBC_HMAC_SHA256 | Self::AEAD_AES_256_CBC_HMAC_SHA256_RANDOMIZED => {
                Ok(Self::AeadAes256CbcHmacSha256Randomized)
            }
            Self::AEAD_AES_256_CBC_HMAC_SHA256_DETERMINISTIC => {
                Ok(Self::AeadAes256CbcHmacSha256Deterministic)
            }
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl TryFrom<String> for EncryptionAlgorithm {
    type Error = CryptoError;

    fn try_from(value: String) -> CryptoResult<Self> {
        value.parse()
    }
}

impl From<EncryptionAlgorithm> for String {
    fn from(algorithm: EncryptionAlgorithm) -> Self {
        algorithm.name().to_string()
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
