//! Root key and derived sub-keys for AEAD_AES_256_CBC_HMAC_SHA256.
//!
//! A single 256-bit root key is expanded into four purpose-bound sub-keys by
//! HMAC-SHA-256(root key, label). Derivation happens once, when the key
//! object is built, and the results live on the object until it is dropped.

use crate::error::{CryptoError, CryptoResult};
use crate::security::{SHA256_DIGEST_SIZE, hmac_sha256_parts};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Root and sub-key size in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Algorithm version byte embedded in every ciphertext produced with these
/// keys.
pub const ALGORITHM_VERSION: u8 = 0x01;

const ALGORITHM_NAME: &str = "AEAD_AES_256_CBC_HMAC_SHA256";

fn derivation_label(purpose: &str) -> Vec<u8> {
    // Labels are hashed as UTF-16LE so keys derived here match existing
    // readers of this format.
    format!(
        "Microsoft SQL Server cell {purpose} key with encryption algorithm:{ALGORITHM_NAME} and key length:{}",
        KEY_SIZE * 8
    )
    .encode_utf16()
    .flat_map(u16::to_le_bytes)
    .collect()
}

/// The four sub-keys derived from one root key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeySet {
    encryption_key: [u8; KEY_SIZE],
    mac_key: [u8; KEY_SIZE],
    iv_key: [u8; KEY_SIZE],
    tag_key: [u8; KEY_SIZE],
}

impl DerivedKeySet {
    /// Derives all sub-keys from `root_key`. Pure and deterministic.
    pub fn derive(root_key: &[u8; KEY_SIZE]) -> CryptoResult<Self> {
        let derive_one = |purpose: &str| -> CryptoResult<[u8; KEY_SIZE]> {
            let digest: [u8; SHA256_DIGEST_SIZE] =
                hmac_sha256_parts(root_key, &[&derivation_label(purpose)])?;
            Ok(digest)
        };

        Ok(Self {
            encryption_key: derive_one("encryption")?,
            mac_key: derive_one("MAC")?,
            iv_key: derive_one("IV")?,
            tag_key: derive_one("tag")?,
        })
    }

    pub fn encryption_key(&self) -> &[u8; KEY_SIZE] {
        &self.encryption_key
    }

    pub fn mac_key(&self) -> &[u8; KEY_SIZE] {
        &self.mac_key
    }

    pub fn iv_key(&self) -> &[u8; KEY_SIZE] {
        &self.iv_key
    }

    /// Key reserved for binding auxiliary tags to this root key.
    pub fn tag_key(&self) -> &[u8; KEY_SIZE] {
        &self.tag_key
    }
}

impl std::fmt::Debug for DerivedKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKeySet([REDACTED])")
    }
}

/// Root key plus its memoized sub-keys.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AeadAes256CbcHmac256EncryptionKey {
    root_key: [u8; KEY_SIZE],
    derived: DerivedKeySet,
    #[zeroize(skip)]
    version: u8,
}

impl AeadAes256CbcHmac256EncryptionKey {
    /// Builds a key for the current algorithm version.
    pub fn new(root_key: &[u8]) -> CryptoResult<Self> {
        Self::with_version(root_key, ALGORITHM_VERSION)
    }

    /// Builds a key bound to an explicit algorithm version byte.
    pub fn with_version(root_key: &[u8], version: u8) -> CryptoResult<Self> {
        let root_key: [u8; KEY_SIZE] =
            root_key
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: root_key.len(),
                })?;
        let derived = DerivedKeySet::derive(&root_key)?;
        Ok(Self {
            root_key,
            derived,
            version,
        })
    }

    pub fn root_key(&self) -> &[u8; KEY_SIZE] {
        &self.root_key
    }

    pub fn derived(&self) -> &DerivedKeySet {
        &self.derived
    }

    pub fn version(&self) -> u8 {
        self.version
    }
}

impl std::fmt::Debug for AeadAes256CbcHmac256EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AeadAes256CbcHmac256EncryptionKey(v{}, [REDACTED])", self.version)
    }
}
