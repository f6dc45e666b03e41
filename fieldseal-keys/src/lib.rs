//! Data encryption key lifecycle for fieldseal.
//!
//! Provides:
//! - DEK records and a pluggable persistence store
//! - Key wrap providers (vault-backed, plus a byte-shift reference provider)
//! - A TTL cache of unwrapped keys with per-id unwrap de-duplication
//! - The DEK provider (resolve, create, rewrap) and the `Encryptor` facade

pub mod cache;
pub mod config;
pub mod dek;
pub mod encryptor;
pub mod error;
pub mod provider;
pub mod shift;
pub mod store;
pub mod types;
pub mod vault;
pub mod wrap;

pub use cache::{CachedKey, UnwrappedKeyCache};
pub use config::EncryptionConfig;
pub use dek::DataEncryptionKey;
pub use encryptor::{DataEncryptionKeyEncryptor, Encryptor};
pub use error::{KeyError, KeyResult};
pub use provider::DataEncryptionKeyProvider;
pub use shift::{SHIFT_METADATA_TYPE, ShiftKeyWrapProvider};
pub use store::{DataEncryptionKeyStore, InMemoryDekStore};
pub use types::*;
pub use vault::{
    KeyOperation, RecoveryLevel, VAULT_METADATA_TYPE, VaultClient, VaultKeyPolicy, VaultKeyProperties,
    VaultKeyType, VaultKeyWrapProvider,
};
pub use wrap::KeyWrapProvider;
