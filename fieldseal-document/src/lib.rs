//! Document-level field encryption for fieldseal.
//!
//! Encrypts selected JSON properties of a document under a data encryption
//! key and records what was done in an `_ei` envelope next to the
//! cleartext fields. Decryption restores the original document; batch
//! decryption isolates per-document failures.

pub mod error;
pub mod options;
pub mod processor;
pub mod properties;

pub use error::{DecryptionFailure, DocumentError, DocumentResult};
pub use options::{EncryptionOptions, PathPolicy};
pub use processor::EncryptionProcessor;
pub use properties::{ENCRYPTION_FORMAT_VERSION, ENCRYPTION_PROPERTIES_KEY, EncryptionProperties};
