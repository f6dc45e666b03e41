//! Vault-backed wrap provider against a mock vault client.

use async_trait::async_trait;
use fieldseal_crypto::EncryptionAlgorithm;
use fieldseal_keys::{
    DataEncryptionKeyProvider, EncryptionConfig, InMemoryDekStore, KeyError, KeyOperation,
    KeyResult, KeyWrapProvider, RecoveryLevel, VaultClient, VaultKeyPolicy, VaultKeyProperties,
    VaultKeyType, VaultKeyWrapProvider, WrapMetadata,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// XORs key bytes with a per-key pad; records the algorithm it was asked for.
struct MockVault {
    keys: Mutex<HashMap<String, VaultKeyProperties>>,
    algorithms: Mutex<Vec<String>>,
}

impl MockVault {
    fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            algorithms: Mutex::new(Vec::new()),
        }
    }

    fn add(&self, props: VaultKeyProperties) {
        self.keys.lock().unwrap().insert(props.key_id.clone(), props);
    }

    fn pad(key_id: &str) -> u8 {
        key_id.bytes().fold(0x5a, |acc, b| acc ^ b)
    }
}

#[async_trait]
impl VaultClient for MockVault {
    async fn key_properties(&self, key_id: &str) -> KeyResult<VaultKeyProperties> {
        self.keys
            .lock()
            .unwrap()
            .get(key_id)
            .cloned()
            .ok_or_else(|| KeyError::Provider(format!("vault key {key_id} not found")))
    }

    async fn wrap_key(&self, key_id: &str, algorithm: &str, key: &[u8]) -> KeyResult<Vec<u8>> {
        self.algorithms.lock().unwrap().push(algorithm.to_string());
        let pad = Self::pad(key_id);
        Ok(key.iter().map(|b| b ^ pad).collect())
    }

    async fn unwrap_key(
        &self,
        key_id: &str,
        algorithm: &str,
        wrapped_key: &[u8],
    ) -> KeyResult<Vec<u8>> {
        self.algorithms.lock().unwrap().push(algorithm.to_string());
        let pad = Self::pad(key_id);
        Ok(wrapped_key.iter().map(|b| b ^ pad).collect())
    }
}

fn props(key_id: &str) -> VaultKeyProperties {
    VaultKeyProperties {
        key_id: key_id.to_string(),
        enabled: true,
        key_type: VaultKeyType::RsaHsm,
        key_ops: vec![KeyOperation::WrapKey, KeyOperation::UnwrapKey],
        recovery_level: RecoveryLevel::Recoverable,
    }
}

fn provider(vault: Arc<MockVault>, policy: VaultKeyPolicy) -> VaultKeyWrapProvider {
    VaultKeyWrapProvider::new(vault, policy, Duration::from_secs(120))
}

const KEY_URL: &str = "https://vault.example/keys/mk/1";

// ── Wrap / unwrap ───────────────────────────────────────────────

#[tokio::test]
async fn wrap_unwrap_roundtrip() {
    let vault = Arc::new(MockVault::new());
    vault.add(props(KEY_URL));
    let provider = provider(vault.clone(), VaultKeyPolicy::default());
    let metadata = VaultKeyWrapProvider::metadata("mk", KEY_URL);

    let key = [7u8; 32];
    let wrapped = provider.wrap_key(&key, &metadata).await.unwrap();
    assert_ne!(wrapped.wrapped_key, key);
    assert_eq!(wrapped.metadata.algorithm.as_deref(), Some("RSA-OAEP"));

    let unwrapped = provider
        .unwrap_key(&wrapped.wrapped_key, &wrapped.metadata)
        .await
        .unwrap();
    assert_eq!(*unwrapped.raw_key, key);
    assert_eq!(unwrapped.cache_ttl, Duration::from_secs(120));
}

#[tokio::test]
async fn metadata_algorithm_is_forwarded() {
    let vault = Arc::new(MockVault::new());
    vault.add(props(KEY_URL));
    let provider = provider(vault.clone(), VaultKeyPolicy::default());
    let metadata = WrapMetadata::new("vault", "mk", KEY_URL).with_algorithm("RSA-OAEP-256");

    provider.wrap_key(&[1; 32], &metadata).await.unwrap();
    assert_eq!(*vault.algorithms.lock().unwrap(), vec!["RSA-OAEP-256".to_string()]);
}

#[tokio::test]
async fn missing_algorithm_defaults() {
    let vault = Arc::new(MockVault::new());
    vault.add(props(KEY_URL));
    let provider = provider(vault.clone(), VaultKeyPolicy::default());
    let metadata = WrapMetadata::new("vault", "mk", KEY_URL);

    let wrapped = provider.wrap_key(&[1; 32], &metadata).await.unwrap();
    assert_eq!(wrapped.metadata.algorithm.as_deref(), Some("RSA-OAEP"));
}

#[tokio::test]
async fn empty_inputs_rejected_before_vault_call() {
    let vault = Arc::new(MockVault::new());
    vault.add(props(KEY_URL));
    let provider = provider(vault.clone(), VaultKeyPolicy::default());
    let metadata = VaultKeyWrapProvider::metadata("mk", KEY_URL);

    let err = provider.wrap_key(&[], &metadata).await.unwrap_err();
    assert!(matches!(err, KeyError::InvalidKeyMaterial(_)));
    let err = provider.unwrap_key(&[], &metadata).await.unwrap_err();
    assert!(matches!(err, KeyError::InvalidKeyMaterial(_)));
    assert!(vault.algorithms.lock().unwrap().is_empty());
}

#[tokio::test]
async fn foreign_metadata_type_rejected() {
    let vault = Arc::new(MockVault::new());
    let provider = provider(vault, VaultKeyPolicy::default());
    let metadata = WrapMetadata::new("test-shift", "mk", "3");

    let err = provider.wrap_key(&[1; 32], &metadata).await.unwrap_err();
    assert!(matches!(err, KeyError::UnsupportedWrapMetadata(_)));
}

#[tokio::test]
async fn empty_key_identifier_rejected() {
    let vault = Arc::new(MockVault::new());
    let provider = provider(vault, VaultKeyPolicy::default());
    let metadata = WrapMetadata::new("vault", "mk", "");

    let err = provider.wrap_key(&[1; 32], &metadata).await.unwrap_err();
    assert!(matches!(err, KeyError::UnsupportedWrapMetadata(_)));
}

// ── Policy ──────────────────────────────────────────────────────

async fn policy_error(props: VaultKeyProperties, policy: VaultKeyPolicy) -> String {
    let vault = Arc::new(MockVault::new());
    vault.add(props);
    let provider = provider(vault, policy);
    let metadata = VaultKeyWrapProvider::metadata("mk", KEY_URL);
    match provider.wrap_key(&[1; 32], &metadata).await {
        Err(KeyError::PolicyViolation(msg)) => msg,
        other => panic!("expected PolicyViolation, got: {other:?}"),
    }
}

#[tokio::test]
async fn disabled_key_violates_policy() {
    let mut p = props(KEY_URL);
    p.enabled = false;
    let msg = policy_error(p, VaultKeyPolicy::default()).await;
    assert!(msg.contains("disabled"), "got: {msg}");
}

#[tokio::test]
async fn missing_operation_violates_policy() {
    let mut p = props(KEY_URL);
    p.key_ops = vec![KeyOperation::UnwrapKey];
    let msg = policy_error(p, VaultKeyPolicy::default()).await;
    assert!(msg.contains("WrapKey"), "got: {msg}");
}

#[tokio::test]
async fn software_key_violates_hsm_policy() {
    let mut p = props(KEY_URL);
    p.key_type = VaultKeyType::Rsa;
    let policy = VaultKeyPolicy {
        require_hsm: true,
        ..VaultKeyPolicy::default()
    };
    let msg = policy_error(p, policy).await;
    assert!(msg.contains("HSM"), "got: {msg}");
}

#[tokio::test]
async fn purgeable_key_violates_default_policy() {
    let mut p = props(KEY_URL);
    p.recovery_level = RecoveryLevel::Purgeable;
    let msg = policy_error(p, VaultKeyPolicy::default()).await;
    assert!(msg.contains(KEY_URL), "got: {msg}");
}

#[tokio::test]
async fn purgeable_key_allowed_when_not_required() {
    let vault = Arc::new(MockVault::new());
    let mut p = props(KEY_URL);
    p.recovery_level = RecoveryLevel::Purgeable;
    p.key_type = VaultKeyType::Oct;
    vault.add(p);
    let policy = VaultKeyPolicy {
        require_hsm: false,
        require_purge_protection: false,
    };
    let provider = provider(vault, policy);
    let metadata = VaultKeyWrapProvider::metadata("mk", KEY_URL);
    assert!(provider.wrap_key(&[1; 32], &metadata).await.is_ok());
}

#[tokio::test]
async fn config_drives_policy_and_ttl() {
    let vault = Arc::new(MockVault::new());
    let mut soft = props(KEY_URL);
    soft.key_type = VaultKeyType::Rsa;
    vault.add(soft);
    let metadata = VaultKeyWrapProvider::metadata("mk", KEY_URL);

    let lenient = EncryptionConfig {
        default_key_cache_ttl_secs: 90,
        ..EncryptionConfig::default()
    };
    let provider = VaultKeyWrapProvider::from_config(vault.clone(), &lenient);
    let wrapped = provider.wrap_key(&[3; 32], &metadata).await.unwrap();
    let unwrapped = provider
        .unwrap_key(&wrapped.wrapped_key, &wrapped.metadata)
        .await
        .unwrap();
    assert_eq!(unwrapped.cache_ttl, Duration::from_secs(90));

    let strict = EncryptionConfig {
        vault_policy: VaultKeyPolicy {
            require_hsm: true,
            ..VaultKeyPolicy::default()
        },
        ..EncryptionConfig::default()
    };
    let provider = VaultKeyWrapProvider::from_config(vault, &strict);
    let err = provider.wrap_key(&[3; 32], &metadata).await.unwrap_err();
    assert!(matches!(err, KeyError::PolicyViolation(_)));
}

#[test]
fn recovery_levels_classified() {
    assert!(RecoveryLevel::Recoverable.is_purge_protected());
    assert!(RecoveryLevel::CustomizedRecoverableProtectedSubscription.is_purge_protected());
    assert!(!RecoveryLevel::RecoverablePurgeable.is_purge_protected());
    assert!(!RecoveryLevel::CustomizedRecoverablePurgeable.is_purge_protected());
}

#[test]
fn key_properties_deserialize_from_vault_json() {
    let json = r#"{
        "keyId": "https://vault.example/keys/mk/1",
        "enabled": true,
        "keyType": "RSA-HSM",
        "keyOps": ["wrapKey", "unwrapKey"],
        "recoveryLevel": "Recoverable+Purgeable"
    }"#;
    let parsed: VaultKeyProperties = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.key_type, VaultKeyType::RsaHsm);
    assert_eq!(parsed.key_ops, vec![KeyOperation::WrapKey, KeyOperation::UnwrapKey]);
    assert_eq!(parsed.recovery_level, RecoveryLevel::RecoverablePurgeable);
}

// ── Through the DEK provider ────────────────────────────────────

#[tokio::test]
async fn dek_lifecycle_through_vault() {
    let vault = Arc::new(MockVault::new());
    vault.add(props(KEY_URL));
    vault.add(props("https://vault.example/keys/mk/2"));
    let config = EncryptionConfig::default();
    let wrap = Arc::new(VaultKeyWrapProvider::from_config(vault.clone(), &config));
    let dek_provider =
        DataEncryptionKeyProvider::new(Arc::new(InMemoryDekStore::new()), wrap, &config);
    let alg = EncryptionAlgorithm::AeadAes256CbcHmacSha256Randomized;

    dek_provider
        .create_dek("dek-1", alg, &VaultKeyWrapProvider::metadata("mk", KEY_URL))
        .await
        .unwrap();
    let before = dek_provider.resolve("dek-1", alg).await.unwrap();
    let ciphertext = before.encrypt_data(b"card number").unwrap();

    let rotated = VaultKeyWrapProvider::metadata("mk", "https://vault.example/keys/mk/2");
    dek_provider.rewrap_dek("dek-1", &rotated).await.unwrap();

    let after = dek_provider.resolve("dek-1", alg).await.unwrap();
    assert_eq!(after.decrypt_data(&ciphertext).unwrap(), b"card number");
}
