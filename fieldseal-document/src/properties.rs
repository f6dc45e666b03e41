//! The encryption properties envelope attached to processed documents.

use serde::{Deserialize, Serialize};

/// Document property that holds the envelope.
pub const ENCRYPTION_PROPERTIES_KEY: &str = "_ei";

/// Envelope format written by this crate.
pub const ENCRYPTION_FORMAT_VERSION: u32 = 3;

/// Side-channel record of how a document was encrypted.
///
/// Present only when at least one path was encrypted. `encrypted_data` is
/// set when the cleartext fields were removed rather than replaced; it then
/// holds one ciphertext over all removed values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionProperties {
    pub encryption_format_version: u32,
    pub encryption_algorithm: String,
    pub data_encryption_key_id: String,
    pub encrypted_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    pub encrypted_data: Option<Vec<u8>>,
}

impl EncryptionProperties {
    pub fn new(
        encryption_algorithm: impl Into<String>,
        data_encryption_key_id: impl Into<String>,
        encrypted_paths: Vec<String>,
    ) -> Self {
        Self {
            encryption_format_version: ENCRYPTION_FORMAT_VERSION,
            encryption_algorithm: encryption_algorithm.into(),
            data_encryption_key_id: data_encryption_key_id.into(),
            encrypted_paths,
            encrypted_data: None,
        }
    }
}

mod base64_opt {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_str(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
