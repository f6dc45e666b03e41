//! Shared test helpers: an instrumented wrap provider and provider wiring.

#![allow(dead_code)]

use async_trait::async_trait;
use fieldseal_keys::{
    DataEncryptionKey, DataEncryptionKeyProvider, EncryptionConfig, InMemoryDekStore, KeyError, KeyResult,
    KeyWrapProvider, ShiftKeyWrapProvider, UnwrapResult, WrapMetadata, WrapResult,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use zeroize::Zeroizing;

/// Byte-shift provider that counts calls and can be told to misbehave.
pub struct InstrumentedWrapProvider {
    inner: ShiftKeyWrapProvider,
    pub wrap_calls: AtomicUsize,
    pub unwrap_calls: AtomicUsize,
    /// Metadata names whose unwrap fails with a provider error.
    failing: Mutex<HashSet<String>>,
    /// When set, unwrap returns an empty raw key.
    empty_unwrap: Mutex<bool>,
    unwrap_delay: Duration,
}

impl InstrumentedWrapProvider {
    pub fn new(cache_ttl: Duration) -> Self {
        Self::with_delay(cache_ttl, Duration::ZERO)
    }

    pub fn with_delay(cache_ttl: Duration, unwrap_delay: Duration) -> Self {
        Self {
            inner: ShiftKeyWrapProvider::new(cache_ttl),
            wrap_calls: AtomicUsize::new(0),
            unwrap_calls: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
            empty_unwrap: Mutex::new(false),
            unwrap_delay,
        }
    }

    pub fn fail_unwrap_for(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn return_empty_unwrap(&self) {
        *self.empty_unwrap.lock().unwrap() = true;
    }

    pub fn unwraps(&self) -> usize {
        self.unwrap_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyWrapProvider for InstrumentedWrapProvider {
    async fn wrap_key(&self, key: &[u8], metadata: &WrapMetadata) -> KeyResult<WrapResult> {
        self.wrap_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.wrap_key(key, metadata).await
    }

    async fn unwrap_key(
        &self,
        wrapped_key: &[u8],
        metadata: &WrapMetadata,
    ) -> KeyResult<UnwrapResult> {
        self.unwrap_calls.fetch_add(1, Ordering::SeqCst);
        if !self.unwrap_delay.is_zero() {
            tokio::time::sleep(self.unwrap_delay).await;
        }
        if self.failing.lock().unwrap().contains(&metadata.name) {
            return Err(KeyError::Provider(format!("master key {} unavailable", metadata.name)));
        }
        if *self.empty_unwrap.lock().unwrap() {
            return Ok(UnwrapResult {
                raw_key: Zeroizing::new(Vec::new()),
                cache_ttl: Duration::from_secs(60),
            });
        }
        self.inner.unwrap_key(wrapped_key, metadata).await
    }
}

pub struct Harness {
    pub store: Arc<InMemoryDekStore>,
    pub wrap: Arc<InstrumentedWrapProvider>,
    pub provider: Arc<DataEncryptionKeyProvider>,
}

pub fn harness(wrap: InstrumentedWrapProvider) -> Harness {
    harness_with_config(wrap, &EncryptionConfig::default())
}

pub fn harness_with_config(wrap: InstrumentedWrapProvider, config: &EncryptionConfig) -> Harness {
    let store = Arc::new(InMemoryDekStore::new());
    let wrap = Arc::new(wrap);
    let provider = Arc::new(DataEncryptionKeyProvider::new(
        store.clone(),
        wrap.clone(),
        config,
    ));
    Harness {
        store,
        wrap,
        provider,
    }
}

/// True when ciphertext from `a` authenticates under `b`.
pub fn same_key(a: &DataEncryptionKey, b: &DataEncryptionKey) -> bool {
    let ciphertext = a.encrypt_data(b"key check").unwrap();
    b.decrypt_data(&ciphertext).is_ok()
}

pub fn shift(name: &str, amount: u8) -> WrapMetadata {
    ShiftKeyWrapProvider::metadata(name, amount)
}
