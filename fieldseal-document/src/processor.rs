//! Document-level encryption.
//!
//! Walks a JSON document, encrypts the values at the configured paths
//! through an [`Encryptor`], and attaches an [`EncryptionProperties`]
//! envelope under [`ENCRYPTION_PROPERTIES_KEY`]. Decryption is the inverse.
//! The processor keeps no state between calls.

use crate::error::{DecryptionFailure, DocumentError, DocumentResult};
use crate::options::{EncryptionOptions, PathPolicy};
use crate::properties::{ENCRYPTION_FORMAT_VERSION, ENCRYPTION_PROPERTIES_KEY, EncryptionProperties};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fieldseal_crypto::EncryptionAlgorithm;
use fieldseal_keys::{Encryptor, KeyError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Property that may never be encrypted.
const ID_PATH: &str = "/id";

/// A member taken out of the document under [`PathPolicy::Remove`], with its
/// position in the parent object at the time it was removed.
#[derive(Debug, Serialize, Deserialize)]
struct RemovedMember {
    path: String,
    index: usize,
    value: Value,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EncryptionProcessor;

impl EncryptionProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Encrypts the paths named in `options` and returns the new document.
    ///
    /// Every path is validated before anything is encrypted, so a missing
    /// path fails the call without side effects. `null` values are left in
    /// place. A document with nothing to encrypt is returned without an
    /// envelope.
    pub async fn encrypt(
        &self,
        document: &[u8],
        encryptor: &dyn Encryptor,
        options: &EncryptionOptions,
    ) -> DocumentResult<Vec<u8>> {
        let doc = parse_object(document)?;
        if doc.contains_key(ENCRYPTION_PROPERTIES_KEY) {
            return Err(DocumentError::InvalidDocument(format!(
                "document already carries {ENCRYPTION_PROPERTIES_KEY}"
            )));
        }
        if options.dek_id.is_empty() {
            return Err(DocumentError::InvalidDocument("dek_id is empty".to_string()));
        }
        let _: EncryptionAlgorithm = options.algorithm.parse().map_err(KeyError::from)?;

        let paths = normalize_paths(&options.paths_to_encrypt)?;
        let mut root = Value::Object(doc);
        for path in &paths {
            if root.pointer(path).is_none() {
                return Err(DocumentError::PathNotFound(path.clone()));
            }
        }

        let mut encrypted_paths = Vec::new();
        let mut encrypted_data = None;
        match options.path_policy {
            PathPolicy::Replace => {
                for path in &paths {
                    let Some(slot) = root.pointer_mut(path) else {
                        return Err(DocumentError::PathNotFound(path.clone()));
                    };
                    if slot.is_null() {
                        continue;
                    }
                    let plaintext = serde_json::to_vec(slot)?;
                    let ciphertext = encryptor
                        .encrypt(&plaintext, &options.dek_id, &options.algorithm)
                        .await?;
                    *slot = Value::String(STANDARD.encode(ciphertext));
                    encrypted_paths.push(path.clone());
                }
            }
            PathPolicy::Remove => {
                let mut removed = Vec::new();
                for path in &paths {
                    if root.pointer(path).is_some_and(Value::is_null) {
                        continue;
                    }
                    let (index, value) = take_at(&mut root, path)?;
                    removed.push(RemovedMember {
                        path: path.clone(),
                        index,
                        value,
                    });
                    encrypted_paths.push(path.clone());
                }
                if !removed.is_empty() {
                    let plaintext = serde_json::to_vec(&removed)?;
                    let ciphertext = encryptor
                        .encrypt(&plaintext, &options.dek_id, &options.algorithm)
                        .await?;
                    encrypted_data = Some(ciphertext);
                }
            }
        }

        if encrypted_paths.is_empty() {
            debug!("no non-null values at configured paths, document left unchanged");
            return Ok(serde_json::to_vec(&root)?);
        }

        debug!(
            "encrypted {} path(s) with data encryption key {}",
            encrypted_paths.len(),
            options.dek_id
        );
        let mut properties =
            EncryptionProperties::new(&options.algorithm, &options.dek_id, encrypted_paths);
        properties.encrypted_data = encrypted_data;
        let envelope = serde_json::to_value(&properties)?;
        if let Value::Object(map) = &mut root {
            map.insert(ENCRYPTION_PROPERTIES_KEY.to_string(), envelope);
        }
        Ok(serde_json::to_vec(&root)?)
    }

    /// Decrypts a document produced by [`encrypt`](Self::encrypt).
    ///
    /// A document without an envelope is returned unchanged. A failure to
    /// decrypt a recorded path yields [`DocumentError::DecryptionFailed`].
    pub async fn decrypt(
        &self,
        document: &[u8],
        encryptor: &dyn Encryptor,
    ) -> DocumentResult<Vec<u8>> {
        let mut doc = parse_object(document)?;
        let Some(envelope) = doc.shift_remove(ENCRYPTION_PROPERTIES_KEY) else {
            return Ok(document.to_vec());
        };
        let properties: EncryptionProperties = serde_json::from_value(envelope).map_err(|e| {
            DocumentError::InvalidDocument(format!("malformed {ENCRYPTION_PROPERTIES_KEY}: {e}"))
        })?;
        if properties.encryption_format_version != ENCRYPTION_FORMAT_VERSION {
            return Err(DocumentError::UnsupportedFormatVersion(
                properties.encryption_format_version,
            ));
        }

        let dek_id = properties.data_encryption_key_id.as_str();
        let algorithm = properties.encryption_algorithm.as_str();
        let mut root = Value::Object(doc);

        match properties.encrypted_data {
            None => {
                for path in &properties.encrypted_paths {
                    let Some(slot) = root.pointer_mut(path) else {
                        return Err(DocumentError::PathNotFound(path.clone()));
                    };
                    let ciphertext = match slot.as_str().map(|s| STANDARD.decode(s)) {
                        Some(Ok(bytes)) => bytes,
                        _ => {
                            return Err(DocumentError::InvalidDocument(format!(
                                "value at {path} is not base64 ciphertext"
                            )));
                        }
                    };
                    *slot = decrypt_value(encryptor, path, dek_id, algorithm, ciphertext).await?;
                }
            }
            Some(ciphertext) => {
                let path = properties.encrypted_paths.join(",");
                let removed: Vec<RemovedMember> =
                    decrypt_value(encryptor, &path, dek_id, algorithm, ciphertext).await?;
                for path in &properties.encrypted_paths {
                    if !removed.iter().any(|member| member.path == *path) {
                        return Err(DocumentError::PathNotFound(path.clone()));
                    }
                }
                // Undo removals last-first so every recorded index is valid.
                for member in removed.into_iter().rev() {
                    put_at(&mut root, &member.path, member.index, member.value)?;
                }
            }
        }

        Ok(serde_json::to_vec(&root)?)
    }

    /// Decrypts each document independently.
    ///
    /// One result per input, in input order. A failure on one document is
    /// logged and returned in its slot; the rest of the batch still runs.
    pub async fn decrypt_batch<D: AsRef<[u8]>>(
        &self,
        documents: &[D],
        encryptor: &dyn Encryptor,
    ) -> Vec<DocumentResult<Vec<u8>>> {
        let mut results = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            let result = self.decrypt(document.as_ref(), encryptor).await;
            if let Err(e) = &result {
                match e {
                    DocumentError::DecryptionFailed { path, dek_id, .. } => {
                        warn!("skipping document {index}: decryption of {path} with {dek_id} failed");
                    }
                    other => warn!("skipping document {index}: {other}"),
                }
            }
            results.push(result);
        }
        results
    }
}

/// Decrypts `ciphertext` and parses the plaintext as JSON. Either failure
/// is reported as [`DocumentError::DecryptionFailed`] for `path`.
async fn decrypt_value<T: DeserializeOwned>(
    encryptor: &dyn Encryptor,
    path: &str,
    dek_id: &str,
    algorithm: &str,
    ciphertext: Vec<u8>,
) -> DocumentResult<T> {
    let plaintext = match encryptor.decrypt(&ciphertext, dek_id, algorithm).await {
        Ok(plaintext) => plaintext,
        Err(e) => return Err(decryption_failed(path, dek_id, ciphertext, e.into())),
    };
    serde_json::from_slice(&plaintext)
        .map_err(|e| decryption_failed(path, dek_id, ciphertext, e.into()))
}

fn decryption_failed(
    path: &str,
    dek_id: &str,
    encrypted: Vec<u8>,
    source: DecryptionFailure,
) -> DocumentError {
    DocumentError::DecryptionFailed {
        path: path.to_string(),
        dek_id: dek_id.to_string(),
        encrypted,
        source,
    }
}

fn parse_object(document: &[u8]) -> DocumentResult<Map<String, Value>> {
    match serde_json::from_slice(document)? {
        Value::Object(map) => Ok(map),
        _ => Err(DocumentError::InvalidDocument(
            "document root must be a JSON object".to_string(),
        )),
    }
}

/// Validates paths and drops duplicates, keeping first occurrences.
fn normalize_paths(paths: &[String]) -> DocumentResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.starts_with('/') || path.len() < 2 {
            return Err(DocumentError::invalid_path(
                path,
                "must be a JSON Pointer naming a property",
            ));
        }
        if path == ID_PATH || overlaps(ID_PATH, path) {
            return Err(DocumentError::invalid_path(path, "the id property cannot be encrypted"));
        }
        let reserved = format!("/{ENCRYPTION_PROPERTIES_KEY}");
        if *path == reserved || overlaps(&reserved, path) {
            return Err(DocumentError::invalid_path(path, "reserved property"));
        }
        if out.contains(path) {
            continue;
        }
        if let Some(other) = out.iter().find(|p| overlaps(p, path)) {
            return Err(DocumentError::invalid_path(path, format!("overlaps {other}")));
        }
        out.push(path.clone());
    }
    Ok(out)
}

fn overlaps(a: &str, b: &str) -> bool {
    b.strip_prefix(a).is_some_and(|rest| rest.starts_with('/'))
        || a.strip_prefix(b).is_some_and(|rest| rest.starts_with('/'))
}

/// Splits `/a/b~1c` into the parent pointer `/a` and the member `b/c`.
fn split_parent(path: &str) -> (&str, String) {
    let (parent, token) = path.rsplit_once('/').unwrap_or(("", path));
    (parent, token.replace("~1", "/").replace("~0", "~"))
}

/// Removes the member at `path` and returns its index in the parent object.
fn take_at(root: &mut Value, path: &str) -> DocumentResult<(usize, Value)> {
    let (parent, member) = split_parent(path);
    match root.pointer_mut(parent) {
        Some(Value::Object(map)) => {
            let index = map.keys().position(|key| *key == member);
            match (index, map.shift_remove(&member)) {
                (Some(index), Some(value)) => Ok((index, value)),
                _ => Err(DocumentError::PathNotFound(path.to_string())),
            }
        }
        Some(_) => Err(DocumentError::invalid_path(
            path,
            "only object members can be removed",
        )),
        None => Err(DocumentError::PathNotFound(path.to_string())),
    }
}

fn put_at(root: &mut Value, path: &str, index: usize, value: Value) -> DocumentResult<()> {
    let (parent, member) = split_parent(path);
    match root.pointer_mut(parent) {
        Some(Value::Object(map)) => {
            let index = index.min(map.len());
            map.shift_insert(index, member, value);
            Ok(())
        }
        _ => Err(DocumentError::PathNotFound(path.to_string())),
    }
}
