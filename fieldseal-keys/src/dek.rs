//! A resolved data encryption key.

use crate::error::KeyResult;
use fieldseal_crypto::{
    AeadAes256CbcHmac256Algorithm, AeadAes256CbcHmac256EncryptionKey, EncryptionAlgorithm,
};

/// A named symmetric key bound to its declared algorithm.
///
/// Encrypts and decrypts byte payloads with the key's memoized sub-keys and
/// the encryption type its algorithm declares.
#[derive(Clone, Debug)]
pub struct DataEncryptionKey {
    id: String,
    algorithm: EncryptionAlgorithm,
    aead: AeadAes256CbcHmac256Algorithm,
}

impl DataEncryptionKey {
    /// Builds a key from raw root key bytes.
    pub fn new(id: impl Into<String>, raw_key: &[u8], algorithm: EncryptionAlgorithm) -> KeyResult<Self> {
        let key = AeadAes256CbcHmac256EncryptionKey::new(raw_key)?;
        Ok(Self::from_key(id, key, algorithm))
    }

    /// Builds a key around an already-derived key object.
    pub fn from_key(
        id: impl Into<String>,
        key: AeadAes256CbcHmac256EncryptionKey,
        algorithm: EncryptionAlgorithm,
    ) -> Self {
        Self {
            id: id.into(),
            algorithm,
            aead: AeadAes256CbcHmac256Algorithm::new(key, algorithm.encryption_type()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    pub fn encrypt_data(&self, plaintext: &[u8]) -> KeyResult<Vec<u8>> {
        Ok(self.aead.encrypt_data(plaintext)?)
    }

    pub fn decrypt_data(&self, ciphertext: &[u8]) -> KeyResult<Vec<u8>> {
        Ok(self.aead.decrypt_data(ciphertext)?)
    }
}
