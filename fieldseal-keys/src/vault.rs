//! Wrap provider backed by a remote key vault.
//!
//! The vault performs the actual wrap/unwrap with a key that never leaves
//! it. Before each operation the provider fetches the key's properties and
//! checks them against a [`VaultKeyPolicy`].

use crate::config::EncryptionConfig;
use crate::error::{KeyError, KeyResult};
use crate::types::{UnwrapResult, WrapMetadata, WrapResult};
use crate::wrap::{KeyWrapProvider, ensure_key_material, ensure_metadata_type};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroizing;

/// Metadata type tag understood by [`VaultKeyWrapProvider`].
pub const VAULT_METADATA_TYPE: &str = "vault";

/// Wrap algorithm used when the metadata does not name one.
pub const DEFAULT_WRAP_ALGORITHM: &str = "RSA-OAEP";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultKeyType {
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "RSA-HSM")]
    RsaHsm,
    #[serde(rename = "oct")]
    Oct,
    #[serde(rename = "oct-HSM")]
    OctHsm,
}

impl VaultKeyType {
    pub fn is_hsm(&self) -> bool {
        matches!(self, Self::RsaHsm | Self::OctHsm)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyOperation {
    Encrypt,
    Decrypt,
    WrapKey,
    UnwrapKey,
    Sign,
    Verify,
}

/// Deletion-recovery level reported by the vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryLevel {
    Purgeable,
    #[serde(rename = "Recoverable+Purgeable")]
    RecoverablePurgeable,
    Recoverable,
    #[serde(rename = "Recoverable+ProtectedSubscription")]
    RecoverableProtectedSubscription,
    #[serde(rename = "CustomizedRecoverable+Purgeable")]
    CustomizedRecoverablePurgeable,
    CustomizedRecoverable,
    #[serde(rename = "CustomizedRecoverable+ProtectedSubscription")]
    CustomizedRecoverableProtectedSubscription,
}

impl RecoveryLevel {
    /// True when the key is soft-deletable and protected from purge.
    pub fn is_purge_protected(&self) -> bool {
        matches!(
            self,
            Self::Recoverable
                | Self::RecoverableProtectedSubscription
                | Self::CustomizedRecoverable
                | Self::CustomizedRecoverableProtectedSubscription
        )
    }
}

/// Key properties as returned by the vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultKeyProperties {
    pub key_id: String,
    pub enabled: bool,
    pub key_type: VaultKeyType,
    pub key_ops: Vec<KeyOperation>,
    pub recovery_level: RecoveryLevel,
}

/// Protection requirements a vault key must satisfy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultKeyPolicy {
    /// Only HSM-backed, non-exportable keys are accepted.
    pub require_hsm: bool,
    /// Only soft-delete + purge-protected keys are accepted.
    pub require_purge_protection: bool,
}

impl Default for VaultKeyPolicy {
    fn default() -> Self {
        Self {
            require_hsm: false,
            require_purge_protection: true,
        }
    }
}

impl VaultKeyPolicy {
    /// Checks `props` for an operation that needs `operation`.
    pub fn check(&self, props: &VaultKeyProperties, operation: KeyOperation) -> KeyResult<()> {
        let violation = |reason: String| {
            Err(KeyError::PolicyViolation(format!("{}: {reason}", props.key_id)))
        };

        if !props.enabled {
            return violation("key is disabled".to_string());
        }
        if !props.key_ops.contains(&operation) {
            return violation(format!("key does not permit {operation:?}"));
        }
        if self.require_hsm && !props.key_type.is_hsm() {
            return violation(format!("key type {:?} is not HSM-protected", props.key_type));
        }
        if self.require_purge_protection && !props.recovery_level.is_purge_protected() {
            return violation(format!(
                "recovery level {:?} lacks soft-delete with purge protection",
                props.recovery_level
            ));
        }
        Ok(())
    }
}

/// Remote vault operations used by [`VaultKeyWrapProvider`].
#[async_trait]
pub trait VaultClient: Send + Sync {
    async fn key_properties(&self, key_id: &str) -> KeyResult<VaultKeyProperties>;

    async fn wrap_key(&self, key_id: &str, algorithm: &str, key: &[u8]) -> KeyResult<Vec<u8>>;

    async fn unwrap_key(
        &self,
        key_id: &str,
        algorithm: &str,
        wrapped_key: &[u8],
    ) -> KeyResult<Vec<u8>>;
}

/// Wrap provider that delegates to a [`VaultClient`].
///
/// `metadata.value` is the vault key identifier.
pub struct VaultKeyWrapProvider {
    client: Arc<dyn VaultClient>,
    policy: VaultKeyPolicy,
    cache_ttl: Duration,
}

impl VaultKeyWrapProvider {
    pub fn new(client: Arc<dyn VaultClient>, policy: VaultKeyPolicy, cache_ttl: Duration) -> Self {
        Self {
            client,
            policy,
            cache_ttl,
        }
    }

    /// Enforces `config.vault_policy` and reports
    /// `config.default_key_cache_ttl_secs` for every unwrap.
    pub fn from_config(client: Arc<dyn VaultClient>, config: &EncryptionConfig) -> Self {
        Self::new(client, config.vault_policy.clone(), config.default_key_cache_ttl())
    }

    /// Metadata describing the vault key at `key_id`.
    pub fn metadata(name: &str, key_id: &str) -> WrapMetadata {
        WrapMetadata::new(VAULT_METADATA_TYPE, name, key_id).with_algorithm(DEFAULT_WRAP_ALGORITHM)
    }

    async fn validated_key<'a>(
        &self,
        metadata: &'a WrapMetadata,
        operation: KeyOperation,
    ) -> KeyResult<(&'a str, &'a str)> {
        ensure_metadata_type(metadata, VAULT_METADATA_TYPE)?;
        if metadata.value.is_empty() {
            return Err(KeyError::UnsupportedWrapMetadata(
                "vault metadata has no key identifier".to_string(),
            ));
        }

        let props = self.client.key_properties(&metadata.value).await?;
        self.policy.check(&props, operation)?;
        debug!("vault key {} passed policy for {operation:?}", metadata.value);

        let algorithm = metadata.algorithm.as_deref().unwrap_or(DEFAULT_WRAP_ALGORITHM);
        Ok((metadata.value.as_str(), algorithm))
    }
}

#[async_trait]
impl KeyWrapProvider for VaultKeyWrapProvider {
    async fn wrap_key(&self, key: &[u8], metadata: &WrapMetadata) -> KeyResult<WrapResult> {
        ensure_key_material(key, "raw key")?;
        let (key_id, algorithm) = self.validated_key(metadata, KeyOperation::WrapKey).await?;
        let wrapped_key = self.client.wrap_key(key_id, algorithm, key).await?;

        let mut response = metadata.clone();
        response.algorithm = Some(algorithm.to_string());
        Ok(WrapResult {
            wrapped_key,
            metadata: response,
        })
    }

    async fn unwrap_key(
        &self,
        wrapped_key: &[u8],
        metadata: &WrapMetadata,
    ) -> KeyResult<UnwrapResult> {
        ensure_key_material(wrapped_key, "wrapped key")?;
        let (key_id, algorithm) = self.validated_key(metadata, KeyOperation::UnwrapKey).await?;
        let raw_key = self.client.unwrap_key(key_id, algorithm, wrapped_key).await?;
        Ok(UnwrapResult {
            raw_key: Zeroizing::new(raw_key),
            cache_ttl: self.cache_ttl,
        })
    }
}
