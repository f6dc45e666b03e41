//! Cryptographic core for fieldseal.
//!
//! Provides the AEAD_AES_256_CBC_HMAC_SHA256 algorithm used to encrypt
//! document fields:
//! - AES-256-CBC with PKCS#7 padding for confidentiality
//! - HMAC-SHA-256 over `version || IV || ciphertext` for authenticity
//! - Randomized (random IV) and deterministic (plaintext-derived IV) modes
//!
//! # Key Derivation
//!
//! Each data encryption key is a 256-bit root key. Four sub-keys
//! (encryption, MAC, IV and tag) are derived from it with HMAC-SHA-256 and
//! fixed purpose labels, once per key object. The root key itself never
//! touches data.
//!
//! The security utilities (`sha256`, `hmac_sha256`, `secure_random_bytes`)
//! and the entropy harness that checks the CSPRNG are exported as well.

pub mod aead;
pub mod entropy;
mod error;
pub mod key;
pub mod security;
mod types;

pub use aead::{
    AeadAes256CbcHmac256Algorithm, BLOCK_SIZE, IV_SIZE, MIN_CIPHERTEXT_SIZE, TAG_SIZE, decrypt,
    encrypt,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{ALGORITHM_VERSION, AeadAes256CbcHmac256EncryptionKey, DerivedKeySet, KEY_SIZE};
pub use security::{
    SHA256_DIGEST_SIZE, generate_random_bytes, hmac_sha256, secure_random_bytes, sha256,
};
pub use types::{EncryptionAlgorithm, EncryptionType};
