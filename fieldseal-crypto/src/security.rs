//! Hashing, HMAC and CSPRNG helpers shared by the AEAD primitive and the
//! key layer.

use crate::error::{CryptoError, CryptoResult};
use hmac::{Hmac, Mac};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// SHA-256 output size in bytes.
pub const SHA256_DIGEST_SIZE: usize = 32;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// Computes the SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; SHA256_DIGEST_SIZE] {
    Sha256::digest(data).into()
}

/// Writes the first `output.len()` bytes of HMAC-SHA-256(`key`, `message`)
/// into `output`.
///
/// `output` may be shorter than the digest (truncated MAC) but never longer.
pub fn hmac_sha256(message: &[u8], key: &[u8], output: &mut [u8]) -> CryptoResult<()> {
    if output.len() > SHA256_DIGEST_SIZE {
        return Err(CryptoError::BufferTooSmall {
            requested: output.len(),
            available: SHA256_DIGEST_SIZE,
        });
    }

    let tag = hmac_sha256_parts(key, &[message])?;
    output.copy_from_slice(&tag[..output.len()]);
    Ok(())
}

/// HMAC-SHA-256 over the concatenation of `parts`, without allocating the
/// concatenation.
pub(crate) fn hmac_sha256_parts(key: &[u8], parts: &[&[u8]]) -> CryptoResult<[u8; SHA256_DIGEST_SIZE]> {
    let mut mac = new_mac(key)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// Constructs an HMAC-SHA-256 instance keyed with `key`.
pub(crate) fn new_mac(key: &[u8]) -> CryptoResult<HmacSha256> {
    // HMAC accepts keys of any length; the error arm is unreachable in practice.
    <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: SHA256_DIGEST_SIZE,
        actual: key.len(),
    })
}

/// Fills `output` with bytes from the operating system CSPRNG.
pub fn secure_random_bytes(output: &mut [u8]) -> CryptoResult<()> {
    OsRng
        .try_fill_bytes(output)
        .map_err(|e| CryptoError::Rng(e.to_string()))
}

/// Allocates and fills a buffer of `len` random bytes.
pub fn generate_random_bytes(len: usize) -> CryptoResult<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    secure_random_bytes(&mut bytes)?;
    Ok(bytes)
}
