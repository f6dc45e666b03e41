//! Data encryption key provider.
//!
//! Resolves DEKs by id for encryption and decryption, and runs the caller
//! level create and rewrap flows. Raw key bytes are never persisted; they
//! live only in the [`UnwrappedKeyCache`].

use crate::cache::UnwrappedKeyCache;
use crate::config::EncryptionConfig;
use crate::dek::DataEncryptionKey;
use crate::error::{KeyError, KeyResult};
use crate::store::DataEncryptionKeyStore;
use crate::types::{DataEncryptionKeyRecord, WrapMetadata};
use crate::wrap::{KeyWrapProvider, checked_unwrap, checked_wrap};
use chrono::Utc;
use fieldseal_crypto::{AeadAes256CbcHmac256EncryptionKey, EncryptionAlgorithm, generate_random_bytes};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

pub struct DataEncryptionKeyProvider {
    store: Arc<dyn DataEncryptionKeyStore>,
    wrap_provider: Arc<dyn KeyWrapProvider>,
    cache: UnwrappedKeyCache,
}

impl DataEncryptionKeyProvider {
    pub fn new(
        store: Arc<dyn DataEncryptionKeyStore>,
        wrap_provider: Arc<dyn KeyWrapProvider>,
        config: &EncryptionConfig,
    ) -> Self {
        Self {
            store,
            wrap_provider,
            cache: UnwrappedKeyCache::new(config.max_key_cache_ttl()),
        }
    }

    /// The unwrapped-key cache, for explicit invalidation.
    pub fn cache(&self) -> &UnwrappedKeyCache {
        &self.cache
    }

    /// Generates a fresh DEK, wraps it and persists the wrapped record.
    ///
    /// The raw key is not cached; the first use resolves it through unwrap.
    pub async fn create_dek(
        &self,
        id: &str,
        algorithm: EncryptionAlgorithm,
        metadata: &WrapMetadata,
    ) -> KeyResult<DataEncryptionKeyRecord> {
        let raw_key = Zeroizing::new(generate_random_bytes(algorithm.key_length())?);
        let wrapped = checked_wrap(self.wrap_provider.as_ref(), &raw_key, metadata).await?;

        let record = DataEncryptionKeyRecord::new(id, algorithm, wrapped.wrapped_key, wrapped.metadata);
        let saved = self.store.create(record).await?;
        info!("created data encryption key {id} ({algorithm}) wrapped by {}", metadata.name);
        Ok(saved)
    }

    /// Reads the persisted record for `id`.
    pub async fn read_dek(&self, id: &str) -> KeyResult<DataEncryptionKeyRecord> {
        self.store.read(id).await
    }

    /// Re-protects the DEK under `new_metadata` without changing its raw
    /// value. Data encrypted before the rewrap stays decryptable.
    pub async fn rewrap_dek(
        &self,
        id: &str,
        new_metadata: &WrapMetadata,
    ) -> KeyResult<DataEncryptionKeyRecord> {
        let record = self.store.read(id).await?;
        let unwrapped = checked_unwrap(
            self.wrap_provider.as_ref(),
            id,
            &record.wrapped_key,
            &record.wrap_metadata,
        )
        .await?;
        let wrapped =
            checked_wrap(self.wrap_provider.as_ref(), &unwrapped.raw_key, new_metadata).await?;

        let etag = record.etag.clone();
        let updated = DataEncryptionKeyRecord {
            wrapped_key: wrapped.wrapped_key,
            wrap_metadata: wrapped.metadata,
            last_modified: Utc::now(),
            ..record
        };
        let saved = self.store.replace(updated, &etag).await?;

        // The next resolve re-checks protection under the new metadata.
        self.cache.invalidate(id).await;
        info!("rewrapped data encryption key {id} under {}", new_metadata.name);
        Ok(saved)
    }

    /// Resolves the DEK `id` for use with `algorithm`.
    ///
    /// Serves from cache when an unexpired entry exists. Otherwise reads the
    /// record, unwraps it and caches the result for the provider's TTL.
    /// Concurrent misses for one id share a single unwrap.
    pub async fn resolve(
        &self,
        id: &str,
        algorithm: EncryptionAlgorithm,
    ) -> KeyResult<DataEncryptionKey> {
        if let Some(key) = self.cached(id, algorithm).await? {
            return Ok(key);
        }

        let gate = self.cache.gate(id).await;
        let resolved = {
            let _guard = gate.lock().await;
            self.unwrap_and_cache(id, algorithm).await
        };
        self.cache.release_gate(id, gate).await;
        resolved
    }

    async fn unwrap_and_cache(
        &self,
        id: &str,
        algorithm: EncryptionAlgorithm,
    ) -> KeyResult<DataEncryptionKey> {
        // Another task may have unwrapped while this one waited.
        if let Some(key) = self.cached(id, algorithm).await? {
            return Ok(key);
        }

        debug!("unwrapped-key cache miss for {id}, unwrapping");
        let record = self.store.read(id).await?;
        check_algorithm(id, record.encryption_algorithm, algorithm)?;

        let unwrapped = checked_unwrap(
            self.wrap_provider.as_ref(),
            id,
            &record.wrapped_key,
            &record.wrap_metadata,
        )
        .await
        .map_err(|e| {
            warn!("unwrap of data encryption key {id} failed: {e}");
            e
        })?;

        let key = AeadAes256CbcHmac256EncryptionKey::new(&unwrapped.raw_key)
            .map_err(|e| KeyError::resolution(id, format!("unwrapped key rejected: {e}")))?;
        let key = Arc::new(key);
        self.cache
            .insert(id, Arc::clone(&key), record.encryption_algorithm, unwrapped.cache_ttl)
            .await;
        debug!("cached data encryption key {id} for {:?}", unwrapped.cache_ttl);

        Ok(DataEncryptionKey::from_key(id, (*key).clone(), algorithm))
    }

    async fn cached(
        &self,
        id: &str,
        algorithm: EncryptionAlgorithm,
    ) -> KeyResult<Option<DataEncryptionKey>> {
        let Some(entry) = self.cache.get(id).await else {
            return Ok(None);
        };
        check_algorithm(id, entry.algorithm, algorithm)?;
        Ok(Some(DataEncryptionKey::from_key(id, (*entry.key).clone(), algorithm)))
    }
}

fn check_algorithm(
    id: &str,
    declared: EncryptionAlgorithm,
    requested: EncryptionAlgorithm,
) -> KeyResult<()> {
    if declared != requested {
        return Err(KeyError::resolution(
            id,
            format!("key is declared for {declared}, requested {requested}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shift::ShiftKeyWrapProvider;
    use crate::store::InMemoryDekStore;

    const ALG: EncryptionAlgorithm = EncryptionAlgorithm::AeadAes256CbcHmacSha256Randomized;

    fn provider() -> Arc<DataEncryptionKeyProvider> {
        let config = EncryptionConfig::default();
        Arc::new(DataEncryptionKeyProvider::new(
            Arc::new(InMemoryDekStore::new()),
            Arc::new(ShiftKeyWrapProvider::from_config(&config)),
            &config,
        ))
    }

    #[tokio::test]
    async fn gates_are_released_after_resolve() {
        let provider = provider();
        let metadata = ShiftKeyWrapProvider::metadata("mk-1", 3);
        for i in 0..50 {
            provider.create_dek(&format!("dek-{i}"), ALG, &metadata).await.unwrap();
        }

        let resolves = (0..50).flat_map(|i| {
            let id = format!("dek-{i}");
            [id.clone(), id].map(|id| {
                let provider = Arc::clone(&provider);
                async move { provider.resolve(&id, ALG).await }
            })
        });
        let results = futures::future::join_all(resolves).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(provider.cache().len().await, 50);
        assert_eq!(provider.cache().gate_count().await, 0);
    }

    #[tokio::test]
    async fn failed_resolve_releases_gate() {
        let provider = provider();
        assert!(provider.resolve("missing", ALG).await.is_err());
        assert_eq!(provider.cache().gate_count().await, 0);
    }
}
