//! Shared fixtures for lock protocol tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use locksmith_core::{Clock, Lease, LeaseStore, MemoryLeaseStore, StoreError, StoreResult};

pub const EPOCH: Lease = 1_700_000_000;

/// Clock driven by Tokio's (pausable) time, so `start_paused` tests see the
/// lease clock move exactly as far as the retry sleeps do.
pub struct TokioClock {
    base: Lease,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(base: Lease) -> Self {
        Self {
            base,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Lease {
        self.base + self.origin.elapsed().as_secs() as i64
    }
}

/// Memory store that counts calls and can be told to fail or to lose races.
#[derive(Default)]
pub struct InstrumentedStore {
    pub inner: MemoryLeaseStore,
    pub set_if_absent_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub get_and_replace_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub fail_get: AtomicBool,
    /// Lease a rival writes just before this store's next get-and-replace lands
    pub rival_takeover: std::sync::Mutex<Option<Lease>>,
}

impl InstrumentedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn takeovers(&self) -> usize {
        self.get_and_replace_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeaseStore for InstrumentedStore {
    async fn set_if_absent(&self, key: &str, lease: Lease) -> StoreResult<bool> {
        self.set_if_absent_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.set_if_absent(key, lease).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Lease>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "connection dropped",
            )));
        }
        self.inner.get(key).await
    }

    async fn get_and_replace(&self, key: &str, lease: Lease) -> StoreResult<Option<Lease>> {
        self.get_and_replace_calls.fetch_add(1, Ordering::SeqCst);
        let rival = self.rival_takeover.lock().unwrap().take();
        if let Some(rival) = rival {
            self.inner.get_and_replace(key, rival).await?;
        }
        self.inner.get_and_replace(key, lease).await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}
