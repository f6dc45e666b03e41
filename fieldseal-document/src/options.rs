//! Per-call encryption options.

use serde::{Deserialize, Serialize};

/// What happens to a cleartext field once it is encrypted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathPolicy {
    /// Replace the value with the base64 ciphertext of its JSON form.
    #[default]
    Replace,
    /// Remove the field; all removed values share one ciphertext stored in
    /// the envelope.
    Remove,
}

/// Which paths to encrypt, and under which key and algorithm.
///
/// Paths are JSON Pointers (`/Sensitive`, `/address/city`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionOptions {
    pub paths_to_encrypt: Vec<String>,
    pub dek_id: String,
    pub algorithm: String,
    #[serde(default)]
    pub path_policy: PathPolicy,
}

impl EncryptionOptions {
    pub fn new<P, S>(dek_id: impl Into<String>, algorithm: impl Into<String>, paths: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths_to_encrypt: paths.into_iter().map(Into::into).collect(),
            dek_id: dek_id.into(),
            algorithm: algorithm.into(),
            path_policy: PathPolicy::default(),
        }
    }

    pub fn with_path_policy(mut self, policy: PathPolicy) -> Self {
        self.path_policy = policy;
        self
    }
}
