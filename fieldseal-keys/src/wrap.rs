//! Key wrap provider interface.
//!
//! A provider protects raw DEK bytes with a key held by some external
//! authority. Providers are pluggable and each understands only its own
//! metadata scheme, identified by [`WrapMetadata::type_tag`]. Retries, if
//! any, belong to the provider implementation.

use crate::error::{KeyError, KeyResult};
use crate::types::{UnwrapResult, WrapMetadata, WrapResult};
use async_trait::async_trait;

/// Wraps and unwraps raw DEK bytes against a key-protection authority.
#[async_trait]
pub trait KeyWrapProvider: Send + Sync {
    /// Wraps `key` under the protection described by `metadata`.
    async fn wrap_key(&self, key: &[u8], metadata: &WrapMetadata) -> KeyResult<WrapResult>;

    /// Recovers the raw key from `wrapped_key`, plus how long it may be cached.
    async fn unwrap_key(
        &self,
        wrapped_key: &[u8],
        metadata: &WrapMetadata,
    ) -> KeyResult<UnwrapResult>;
}

/// Rejects a metadata value whose type tag belongs to another provider.
pub fn ensure_metadata_type(metadata: &WrapMetadata, expected: &str) -> KeyResult<()> {
    if metadata.type_tag != expected {
        return Err(KeyError::UnsupportedWrapMetadata(format!(
            "expected type {expected:?}, got {:?}",
            metadata.type_tag
        )));
    }
    Ok(())
}

/// Rejects empty key material before it reaches a provider.
pub fn ensure_key_material(bytes: &[u8], what: &str) -> KeyResult<()> {
    if bytes.is_empty() {
        return Err(KeyError::InvalidKeyMaterial(format!("{what} is empty")));
    }
    Ok(())
}

/// Calls `provider.wrap_key` and validates both sides of the exchange.
pub(crate) async fn checked_wrap(
    provider: &dyn KeyWrapProvider,
    key: &[u8],
    metadata: &WrapMetadata,
) -> KeyResult<WrapResult> {
    ensure_key_material(key, "raw key")?;
    let result = provider.wrap_key(key, metadata).await?;
    if result.wrapped_key.is_empty() {
        return Err(KeyError::InvalidKeyMaterial(
            "key wrap provider returned an empty wrapped key".to_string(),
        ));
    }
    Ok(result)
}

/// Calls `provider.unwrap_key` and validates both sides of the exchange.
///
/// An empty raw key is a resolution failure for `dek_id`, never a zero key.
pub(crate) async fn checked_unwrap(
    provider: &dyn KeyWrapProvider,
    dek_id: &str,
    wrapped_key: &[u8],
    metadata: &WrapMetadata,
) -> KeyResult<UnwrapResult> {
    ensure_key_material(wrapped_key, "wrapped key")?;
    let result = provider.unwrap_key(wrapped_key, metadata).await?;
    if result.raw_key.is_empty() {
        return Err(KeyError::resolution(
            dek_id,
            "key wrap provider returned an empty raw key",
        ));
    }
    Ok(result)
}
