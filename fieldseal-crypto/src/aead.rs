//! AEAD_AES_256_CBC_HMAC_SHA256: AES-256-CBC with an HMAC-SHA-256 tag.
//!
//! Ciphertext layout:
//!
//! ```text
//! [version: 1][IV: 16][AES-CBC ciphertext: N * 16][HMAC-SHA-256 tag: 32]
//! ```
//!
//! The tag covers `version || IV || ciphertext`. Decryption verifies the tag
//! in constant time before a single block is decrypted.

use crate::error::{CryptoError, CryptoResult};
use crate::key::AeadAes256CbcHmac256EncryptionKey;
use crate::security::{hmac_sha256_parts, new_mac, secure_random_bytes};
use crate::types::EncryptionType;
use cbc::cipher::block_padding::{NoPadding, Pkcs7, RawPadding};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::Mac;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// IV size in bytes (one AES block).
pub const IV_SIZE: usize = 16;

/// Authentication tag size in bytes (untruncated HMAC-SHA-256).
pub const TAG_SIZE: usize = 32;

const VERSION_SIZE: usize = 1;

/// Shortest byte string that can be parsed: version, IV and tag.
pub const MIN_CIPHERTEXT_SIZE: usize = VERSION_SIZE + IV_SIZE + TAG_SIZE;

/// A data encryption key bound to an encryption mode.
#[derive(Clone, Debug)]
pub struct AeadAes256CbcHmac256Algorithm {
    key: AeadAes256CbcHmac256EncryptionKey,
    encryption_type: EncryptionType,
}

impl AeadAes256CbcHmac256Algorithm {
    pub fn new(key: AeadAes256CbcHmac256EncryptionKey, encryption_type: EncryptionType) -> Self {
        Self {
            key,
            encryption_type,
        }
    }

    pub fn encryption_type(&self) -> EncryptionType {
        self.encryption_type
    }

    pub fn key(&self) -> &AeadAes256CbcHmac256EncryptionKey {
        &self.key
    }

    /// Encrypts `plaintext` in this algorithm's mode.
    pub fn encrypt_data(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        encrypt(plaintext, &self.key, self.encryption_type)
    }

    /// Decrypts a ciphertext produced by [`Self::encrypt_data`].
    ///
    /// Plaintext-mode algorithms return the input unchanged.
    pub fn decrypt_data(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        match self.encryption_type {
            EncryptionType::Plaintext => Ok(ciphertext.to_vec()),
            _ => decrypt(ciphertext, &self.key),
        }
    }
}

/// Encrypts `plaintext` under `key` and returns the framed ciphertext.
///
/// The version byte written is the key's configured version.
pub fn encrypt(
    plaintext: &[u8],
    key: &AeadAes256CbcHmac256EncryptionKey,
    mode: EncryptionType,
) -> CryptoResult<Vec<u8>> {
    if mode == EncryptionType::Plaintext {
        return Ok(plaintext.to_vec());
    }
    let padded = pkcs7_pad(plaintext);

    let keys = key.derived();
    let mut iv = [0u8; IV_SIZE];
    match mode {
        EncryptionType::Deterministic => {
            let digest = hmac_sha256_parts(keys.iv_key(), &[&padded])?;
            iv.copy_from_slice(&digest[..IV_SIZE]);
        }
        _ => secure_random_bytes(&mut iv)?,
    }

    let cipher = Aes256CbcEnc::new_from_slices(keys.encryption_key(), &iv).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: crate::key::KEY_SIZE,
            actual: keys.encryption_key().len(),
        }
    })?;
    let body = cipher.encrypt_padded_vec_mut::<NoPadding>(&padded);

    let version = [key.version()];
    let tag = hmac_sha256_parts(keys.mac_key(), &[&version, &iv, &body])?;

    let mut out = Vec::with_capacity(VERSION_SIZE + IV_SIZE + body.len() + TAG_SIZE);
    out.extend_from_slice(&version);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&body);
    out.extend_from_slice(&tag);
    Ok(out)
}

/// Authenticates and decrypts a framed ciphertext.
pub fn decrypt(
    ciphertext: &[u8],
    key: &AeadAes256CbcHmac256EncryptionKey,
) -> CryptoResult<Vec<u8>> {
    if ciphertext.len() < MIN_CIPHERTEXT_SIZE {
        return Err(CryptoError::InvalidCiphertextFormat(format!(
            "{} bytes is shorter than the {MIN_CIPHERTEXT_SIZE}-byte minimum",
            ciphertext.len()
        )));
    }

    let (version, rest) = ciphertext.split_at(VERSION_SIZE);
    let (iv, rest) = rest.split_at(IV_SIZE);
    let (body, tag) = rest.split_at(rest.len() - TAG_SIZE);

    if version[0] != key.version() {
        return Err(CryptoError::VersionMismatch {
            expected: key.version(),
            actual: version[0],
        });
    }
    if body.is_empty() || body.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextFormat(format!(
            "cipher body of {} bytes is not a positive multiple of {BLOCK_SIZE}",
            body.len()
        )));
    }

    let keys = key.derived();
    let mut mac = new_mac(keys.mac_key())?;
    mac.update(version);
    mac.update(iv);
    mac.update(body);
    mac.verify_slice(tag)
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    let cipher = Aes256CbcDec::new_from_slices(keys.encryption_key(), iv).map_err(|_| {
        CryptoError::InvalidCiphertextFormat(format!("IV must be {IV_SIZE} bytes"))
    })?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(body)
        .map_err(|_| CryptoError::InvalidPadding)
}

/// PKCS#7-pads `data` to whole blocks. The padded bytes feed both the
/// deterministic IV and the unpadded CBC pass.
fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let tail = data.len() % BLOCK_SIZE;
    let padded_len = data.len() - tail + BLOCK_SIZE;
    let mut padded = Vec::with_capacity(padded_len);
    padded.extend_from_slice(data);
    padded.resize(padded_len, 0);
    Pkcs7::raw_pad(&mut padded[padded_len - BLOCK_SIZE..], tail);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AeadAes256CbcHmac256EncryptionKey {
        AeadAes256CbcHmac256EncryptionKey::new(&[0x42u8; 32]).unwrap()
    }

    #[test]
    fn padding_always_adds_at_least_one_byte() {
        assert_eq!(pkcs7_pad(b"").len(), 16);
        assert_eq!(pkcs7_pad(&[0u8; 15]).len(), 16);
        assert_eq!(pkcs7_pad(&[0u8; 16]).len(), 32);
        assert_eq!(pkcs7_pad(b"abc")[15], 13);
        assert_eq!(pkcs7_pad(&[0u8; 16])[16..], [16u8; 16]);
        assert_eq!(Pkcs7::raw_unpad(&pkcs7_pad(b"abc")).unwrap(), b"abc");
    }

    #[test]
    fn layout_matches_frame() {
        let ct = encrypt(b"hello", &key(), EncryptionType::Randomized).unwrap();
        assert_eq!(ct[0], crate::key::ALGORITHM_VERSION);
        assert_eq!(ct.len(), VERSION_SIZE + IV_SIZE + BLOCK_SIZE + TAG_SIZE);
    }

    #[test]
    fn deterministic_iv_is_hmac_prefix() {
        let k = key();
        let ct = encrypt(b"repeatable", &k, EncryptionType::Deterministic).unwrap();
        let digest = hmac_sha256_parts(k.derived().iv_key(), &[&pkcs7_pad(b"repeatable")]).unwrap();
        assert_eq!(&ct[1..1 + IV_SIZE], &digest[..IV_SIZE]);
    }

    #[test]
    fn bad_padding_behind_valid_tag_reports_padding() {
        // Forge a frame whose tag is valid but whose last block decrypts to
        // bytes that are not PKCS#7 padding.
        let k = key();
        let keys = k.derived();
        let iv = [3u8; IV_SIZE];
        let body = Aes256CbcEnc::new_from_slices(keys.encryption_key(), &iv)
            .unwrap()
            .encrypt_padded_vec_mut::<NoPadding>(&[0u8; 16]);
        let version = [k.version()];
        let tag = hmac_sha256_parts(keys.mac_key(), &[&version, &iv, &body]).unwrap();
        let frame = [&version[..], &iv[..], &body[..], &tag[..]].concat();

        assert_eq!(decrypt(&frame, &k).unwrap_err(), CryptoError::InvalidPadding);
    }

    #[test]
    fn plaintext_mode_is_identity() {
        let algorithm = AeadAes256CbcHmac256Algorithm::new(key(), EncryptionType::Plaintext);
        let out = algorithm.encrypt_data(b"as-is").unwrap();
        assert_eq!(out, b"as-is");
        assert_eq!(algorithm.decrypt_data(&out).unwrap(), b"as-is");
    }
}
