//! Byte-level encryption facade consumed by the document layer.

use crate::error::KeyResult;
use crate::provider::DataEncryptionKeyProvider;
use async_trait::async_trait;
use fieldseal_crypto::EncryptionAlgorithm;
use std::sync::Arc;

/// Encrypts and decrypts byte payloads under a named DEK.
///
/// `algorithm` is an algorithm name such as
/// `AEAD_AES_256_CBC_HMAC_SHA256_RANDOMIZED`.
#[async_trait]
pub trait Encryptor: Send + Sync {
    async fn encrypt(&self, plaintext: &[u8], dek_id: &str, algorithm: &str) -> KeyResult<Vec<u8>>;

    async fn decrypt(&self, ciphertext: &[u8], dek_id: &str, algorithm: &str)
    -> KeyResult<Vec<u8>>;
}

/// [`Encryptor`] that resolves keys through a [`DataEncryptionKeyProvider`].
#[derive(Clone)]
pub struct DataEncryptionKeyEncryptor {
    provider: Arc<DataEncryptionKeyProvider>,
}

impl DataEncryptionKeyEncryptor {
    pub fn new(provider: Arc<DataEncryptionKeyProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &DataEncryptionKeyProvider {
        &self.provider
    }
}

#[async_trait]
impl Encryptor for DataEncryptionKeyEncryptor {
    async fn encrypt(&self, plaintext: &[u8], dek_id: &str, algorithm: &str) -> KeyResult<Vec<u8>> {
        let algorithm: EncryptionAlgorithm = algorithm.parse()?;
        let dek = self.provider.resolve(dek_id, algorithm).await?;
        dek.encrypt_data(plaintext)
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        dek_id: &str,
        algorithm: &str,
    ) -> KeyResult<Vec<u8>> {
        let algorithm: EncryptionAlgorithm = algorithm.parse()?;
        let dek = self.provider.resolve(dek_id, algorithm).await?;
        dek.decrypt_data(ciphertext)
    }
}
