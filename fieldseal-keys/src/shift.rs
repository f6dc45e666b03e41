//! Reference wrap provider that shifts every byte by a fixed amount.
//!
//! This is obfuscation, not cryptography. It exists so the DEK lifecycle
//! can be exercised deterministically without a remote authority. Never use
//! it to protect real keys.

use crate::config::EncryptionConfig;
use crate::error::{KeyError, KeyResult};
use crate::types::{UnwrapResult, WrapMetadata, WrapResult};
use crate::wrap::{KeyWrapProvider, ensure_key_material, ensure_metadata_type};
use async_trait::async_trait;
use std::time::Duration;
use zeroize::Zeroizing;

/// Metadata type tag understood by [`ShiftKeyWrapProvider`].
pub const SHIFT_METADATA_TYPE: &str = "test-shift";

/// Byte-shift wrap provider. `metadata.value` is the shift amount (0-255).
#[derive(Clone, Debug)]
pub struct ShiftKeyWrapProvider {
    cache_ttl: Duration,
}

impl ShiftKeyWrapProvider {
    pub fn new(cache_ttl: Duration) -> Self {
        Self { cache_ttl }
    }

    /// Reports `config.default_key_cache_ttl_secs` for every unwrap.
    pub fn from_config(config: &EncryptionConfig) -> Self {
        Self::new(config.default_key_cache_ttl())
    }

    /// Metadata describing a shift of `amount`.
    pub fn metadata(name: &str, amount: u8) -> WrapMetadata {
        WrapMetadata::new(SHIFT_METADATA_TYPE, name, amount.to_string())
    }

    fn shift_amount(metadata: &WrapMetadata) -> KeyResult<u8> {
        ensure_metadata_type(metadata, SHIFT_METADATA_TYPE)?;
        metadata.value.parse::<u8>().map_err(|_| {
            KeyError::UnsupportedWrapMetadata(format!(
                "shift amount {:?} is not a byte",
                metadata.value
            ))
        })
    }
}

impl Default for ShiftKeyWrapProvider {
    fn default() -> Self {
        Self::from_config(&EncryptionConfig::default())
    }
}

#[async_trait]
impl KeyWrapProvider for ShiftKeyWrapProvider {
    async fn wrap_key(&self, key: &[u8], metadata: &WrapMetadata) -> KeyResult<WrapResult> {
        ensure_key_material(key, "raw key")?;
        let shift = Self::shift_amount(metadata)?;
        Ok(WrapResult {
            wrapped_key: key.iter().map(|b| b.wrapping_add(shift)).collect(),
            metadata: metadata.clone(),
        })
    }

    async fn unwrap_key(
        &self,
        wrapped_key: &[u8],
        metadata: &WrapMetadata,
    ) -> KeyResult<UnwrapResult> {
        ensure_key_material(wrapped_key, "wrapped key")?;
        let shift = Self::shift_amount(metadata)?;
        Ok(UnwrapResult {
            raw_key: Zeroizing::new(wrapped_key.iter().map(|b| b.wrapping_sub(shift)).collect()),
            cache_ttl: self.cache_ttl,
        })
    }
}
