//! Thread-safe cache of unwrapped data encryption keys.
//!
//! Entries hold the derived key object (root key plus sub-keys) and an
//! expiry instant. Expired entries are never served and are evicted lazily
//! on read. Locks on the entry map are held only for map operations, never
//! across a wrap provider call.

use fieldseal_crypto::{AeadAes256CbcHmac256EncryptionKey, EncryptionAlgorithm};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// A cached key and the algorithm its record declares.
#[derive(Clone, Debug)]
pub struct CachedKey {
    pub key: Arc<AeadAes256CbcHmac256EncryptionKey>,
    pub algorithm: EncryptionAlgorithm,
    pub expires_at: Instant,
}

impl CachedKey {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Unwrapped-key cache keyed by DEK id.
#[derive(Clone)]
pub struct UnwrappedKeyCache {
    entries: Arc<RwLock<HashMap<String, CachedKey>>>,
    gates: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    max_ttl: Duration,
}

impl UnwrappedKeyCache {
    /// Creates a cache that clamps every TTL to `max_ttl`.
    pub fn new(max_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            gates: Arc::new(Mutex::new(HashMap::new())),
            max_ttl,
        }
    }

    /// Returns the entry for `dek_id` if present and unexpired.
    pub async fn get(&self, dek_id: &str) -> Option<CachedKey> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(dek_id) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: evict unless another task refreshed it meanwhile.
        let mut entries = self.entries.write().await;
        if entries.get(dek_id).is_some_and(|e| e.is_expired(now)) {
            entries.remove(dek_id);
        }
        None
    }

    /// Caches `key` for `dek_id` until now + `ttl` (clamped).
    pub async fn insert(
        &self,
        dek_id: &str,
        key: Arc<AeadAes256CbcHmac256EncryptionKey>,
        algorithm: EncryptionAlgorithm,
        ttl: Duration,
    ) {
        let expires_at = Instant::now() + ttl.min(self.max_ttl);
        self.entries.write().await.insert(
            dek_id.to_string(),
            CachedKey {
                key,
                algorithm,
                expires_at,
            },
        );
    }

    /// Drops the entry for `dek_id`, forcing the next resolve to unwrap.
    pub async fn invalidate(&self, dek_id: &str) -> bool {
        let removed = self.entries.write().await.remove(dek_id).is_some();
        let mut gates = self.gates.lock().await;
        if gates.get(dek_id).is_some_and(|g| Arc::strong_count(g) == 1) {
            gates.remove(dek_id);
        }
        removed
    }

    /// Drops every entry, and every gate no task is holding.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.gates.lock().await.retain(|_, g| Arc::strong_count(g) > 1);
    }

    /// Returns the number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Per-id gate that serializes concurrent unwraps of the same DEK.
    pub(crate) async fn gate(&self, dek_id: &str) -> Arc<Mutex<()>> {
        self.gates
            .lock()
            .await
            .entry(dek_id.to_string())
            .or_default()
            .clone()
    }

    /// Returns `gate` and drops its map entry when no other task holds it.
    ///
    /// Clones are only handed out under the map lock, so the count cannot
    /// grow while it is checked.
    pub(crate) async fn release_gate(&self, dek_id: &str, gate: Arc<Mutex<()>>) {
        let mut gates = self.gates.lock().await;
        let unshared = gates
            .get(dek_id)
            .is_some_and(|g| Arc::ptr_eq(g, &gate) && Arc::strong_count(&gate) == 2);
        if unshared {
            gates.remove(dek_id);
        }
    }

    #[cfg(test)]
    pub(crate) async fn gate_count(&self) -> usize {
        self.gates.lock().await.len()
    }
}
