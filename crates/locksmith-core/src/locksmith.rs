//! Acquisition engine
//!
//! Each attempt runs the claim sequence against the store:
//! 1. set-if-absent the store key to a fresh expiry; success means the lock is ours
//! 2. otherwise read the stored expiry; a live lease means contention
//! 3. an expired (or vanished) lease is taken over with get-and-replace, and the
//!    value that call displaced decides the race: if it was live, another process
//!    got there first and this one goes back to waiting
//!
//! Contention sleeps [`RETRY_DELAY`] and tries again until the per-request retry
//! budget runs out. Store failures abort immediately.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{LocksmithConfig, RETRY_DELAY};
use crate::error::{LockError, Result, StoreError};
use crate::handle::LockHandle;
use crate::lease::{Clock, Lease, SystemClock, compute_expiry, is_live};
use crate::metrics;
use crate::store::LeaseStore;

/// Per-request state. Never shared between concurrent acquisitions, even for the same key.
#[derive(Debug)]
struct AcquisitionAttempt {
    key: String,
    store_key: String,
    lease_timeout_seconds: u64,
    max_retries: u32,
    retries: u32,
}

enum AttemptOutcome {
    Acquired { expires_at: Lease, path: &'static str },
    Contended { held_until: Lease },
}

/// Lock engine bound to one store and one immutable configuration.
///
/// Cheap to clone; clones share the store connection and configuration.
#[derive(Clone)]
pub struct Locksmith {
    store: Arc<dyn LeaseStore>,
    config: Arc<LocksmithConfig>,
    clock: Arc<dyn Clock>,
}

impl Locksmith {
    pub fn new(store: Arc<dyn LeaseStore>, config: LocksmithConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock, e.g. with a [`crate::ManualClock`] in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &LocksmithConfig {
        &self.config
    }

    /// Acquire `key` with the configured lease timeout and retry budget.
    pub async fn lock(&self, key: &str) -> Result<LockHandle> {
        self.acquire(key, self.config.lease_timeout_seconds, self.config.max_retries)
            .await
    }

    /// Acquire `key`, holding it for at most `lease_timeout_seconds` and giving up
    /// after `max_retries` contended attempts.
    pub async fn acquire(
        &self,
        key: &str,
        lease_timeout_seconds: u64,
        max_retries: u32,
    ) -> Result<LockHandle> {
        let mut attempt = AcquisitionAttempt {
            key: key.to_string(),
            store_key: self.config.store_key(key),
            lease_timeout_seconds,
            max_retries,
            retries: 0,
        };
        let started = Instant::now();

        loop {
            match self.try_once(&attempt).await? {
                AttemptOutcome::Acquired { expires_at, path } => {
                    debug!(
                        key = %attempt.key,
                        expires_at,
                        path,
                        retries = attempt.retries,
                        "acquired lock"
                    );
                    metrics::record_acquired(path, started.elapsed().as_secs_f64());
                    return Ok(LockHandle::new(
                        attempt.key,
                        attempt.store_key,
                        expires_at,
                        self.store.clone(),
                        self.clock.clone(),
                    ));
                }
                AttemptOutcome::Contended { held_until } => {
                    metrics::record_contention();
                    attempt.retries += 1;
                    if attempt.retries > attempt.max_retries {
                        warn!(
                            key = %attempt.key,
                            max_retries = attempt.max_retries,
                            "maximum retries hit while acquiring lock"
                        );
                        metrics::record_retries_exhausted();
                        return Err(LockError::MaxRetriesExceeded { key: attempt.key });
                    }
                    debug!(
                        key = %attempt.key,
                        held_until,
                        retry = attempt.retries,
                        "lock held elsewhere, retrying"
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    async fn try_once(&self, attempt: &AcquisitionAttempt) -> Result<AttemptOutcome> {
        let store_key = attempt.store_key.as_str();

        let candidate = compute_expiry(self.clock.now(), attempt.lease_timeout_seconds);
        let claimed = self
            .store
            .set_if_absent(store_key, candidate)
            .await
            .map_err(|e| self.store_failure("set_if_absent", attempt, e))?;
        if claimed {
            return Ok(AttemptOutcome::Acquired {
                expires_at: candidate,
                path: "claim",
            });
        }

        let stored = self
            .store
            .get(store_key)
            .await
            .map_err(|e| self.store_failure("get", attempt, e))?;
        if let Some(held_until) = stored.filter(|&expiry| is_live(self.clock.now(), expiry)) {
            return Ok(AttemptOutcome::Contended { held_until });
        }

        // Expired or vanished: take over. Another process may be doing the same;
        // whatever value this write displaced decides who won.
        let candidate = compute_expiry(self.clock.now(), attempt.lease_timeout_seconds);
        let previous = self
            .store
            .get_and_replace(store_key, candidate)
            .await
            .map_err(|e| self.store_failure("get_and_replace", attempt, e))?;
        if let Some(held_until) = previous.filter(|&expiry| is_live(self.clock.now(), expiry)) {
            info!(
                key = %attempt.key,
                held_until,
                "lost takeover race for expired lock"
            );
            return Ok(AttemptOutcome::Contended { held_until });
        }

        Ok(AttemptOutcome::Acquired {
            expires_at: candidate,
            path: "takeover",
        })
    }

    fn store_failure(
        &self,
        operation: &'static str,
        attempt: &AcquisitionAttempt,
        error: StoreError,
    ) -> LockError {
        warn!(
            key = %attempt.key,
            operation,
            error = %error,
            "lease store failed during acquisition"
        );
        metrics::record_store_error(operation);
        LockError::Store(error)
    }
}
