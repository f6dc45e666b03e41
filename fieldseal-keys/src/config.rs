//! Key lifecycle configuration.

use crate::vault::VaultKeyPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by the DEK provider and the bundled wrap providers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// TTL reported for unwrapped keys when the key-protection authority
    /// does not dictate one (seconds).
    pub default_key_cache_ttl_secs: u64,

    /// Upper bound applied to any provider-supplied TTL (seconds).
    pub max_key_cache_ttl_secs: u64,

    /// Protection requirements enforced by the vault-backed wrap provider.
    pub vault_policy: VaultKeyPolicy,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            default_key_cache_ttl_secs: 3600, // 1 hour
            max_key_cache_ttl_secs: 86_400,
            vault_policy: VaultKeyPolicy::default(),
        }
    }
}

impl EncryptionConfig {
    pub fn default_key_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.default_key_cache_ttl_secs)
    }

    pub fn max_key_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.max_key_cache_ttl_secs)
    }
}
