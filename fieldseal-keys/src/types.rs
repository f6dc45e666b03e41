//! Shared types for the key lifecycle.

use chrono::{DateTime, Utc};
use fieldseal_crypto::EncryptionAlgorithm;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use zeroize::Zeroizing;

/// Provider-specific description of how a DEK is protected.
///
/// `type_tag` selects the provider scheme; `value` is interpreted by that
/// provider only (a key URI for the vault provider, a shift amount for the
/// reference provider).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapMetadata {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

impl WrapMetadata {
    pub fn new(
        type_tag: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            type_tag: type_tag.into(),
            name: name.into(),
            value: value.into(),
            algorithm: None,
        }
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }
}

/// Output of a wrap call.
#[derive(Clone, Debug)]
pub struct WrapResult {
    pub wrapped_key: Vec<u8>,
    /// Metadata to persist next to the wrapped bytes; needed to unwrap.
    pub metadata: WrapMetadata,
}

/// Output of an unwrap call.
#[derive(Debug)]
pub struct UnwrapResult {
    pub raw_key: Zeroizing<Vec<u8>>,
    /// How long the raw key may be served from cache.
    pub cache_ttl: Duration,
}

/// Persisted record of a data encryption key.
///
/// Only the wrapped key is ever persisted; the raw key lives in the
/// in-memory cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataEncryptionKeyRecord {
    pub id: String,
    pub encryption_algorithm: EncryptionAlgorithm,
    #[serde(with = "base64_bytes")]
    pub wrapped_key: Vec<u8>,
    pub wrap_metadata: WrapMetadata,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Store-assigned resource id.
    #[serde(default)]
    pub rid: String,
    /// Store-assigned version tag for optimistic concurrency.
    #[serde(default)]
    pub etag: String,
}

impl DataEncryptionKeyRecord {
    /// Builds an unsaved record. The store assigns `rid` and `etag`.
    pub fn new(
        id: impl Into<String>,
        encryption_algorithm: EncryptionAlgorithm,
        wrapped_key: Vec<u8>,
        wrap_metadata: WrapMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            encryption_algorithm,
            wrapped_key,
            wrap_metadata,
            created_at: now,
            last_modified: now,
            rid: String::new(),
            etag: String::new(),
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
