//! Lock handle and release guard
//!
//! A [`LockHandle`] is the caller's proof of a successful acquisition. Releasing
//! consumes it. The guard only deletes the store record while the handle's own
//! lease is still live: once it has expired another process may have taken the
//! key over, and deleting it would destroy that owner's lease.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::lease::{Clock, Lease, is_live};
use crate::metrics;
use crate::store::LeaseStore;

/// What a release actually did. Never an error for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The store record was deleted
    Released,
    /// The lease was live but the store had no record left to delete
    AlreadyGone,
    /// The lease had expired; the store record was left alone
    Expired,
    /// The delete failed; the lease will lapse on its own
    Failed,
}

impl ReleaseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseOutcome::Released => "released",
            ReleaseOutcome::AlreadyGone => "already_gone",
            ReleaseOutcome::Expired => "expired",
            ReleaseOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for ReleaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A held lock. Lives only in the acquiring process; dropping it without
/// releasing leaves the lease to expire.
#[must_use = "a lock handle should be released once the critical section is done"]
pub struct LockHandle {
    key: String,
    store_key: String,
    expires_at: Lease,
    store: Arc<dyn LeaseStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("key", &self.key)
            .field("store_key", &self.store_key)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl LockHandle {
    pub(crate) fn new(
        key: String,
        store_key: String,
        expires_at: Lease,
        store: Arc<dyn LeaseStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            key,
            store_key,
            expires_at,
            store,
            clock,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store_key(&self) -> &str {
        &self.store_key
    }

    /// Expiry this process wrote when it claimed the lock.
    pub fn expires_at(&self) -> Lease {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        !is_live(self.clock.now(), self.expires_at)
    }

    /// Release without waiting for the store.
    ///
    /// The expiry check happens now; the delete runs on a task spawned onto the
    /// current Tokio runtime. Without a runtime nothing is deleted and the lease
    /// lapses on its own.
    pub fn release(self) {
        if self.is_expired() {
            self.report_late();
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    self.delete().await;
                });
            }
            Err(e) => {
                error!(
                    key = %self.key,
                    error = %e,
                    "no async runtime to release lock on, leaving lease to expire"
                );
                metrics::record_release(ReleaseOutcome::Failed.as_str());
            }
        }
    }

    /// Release and wait for the store, reporting which branch ran.
    pub async fn release_and_wait(self) -> ReleaseOutcome {
        if self.is_expired() {
            return self.report_late();
        }
        self.delete().await
    }

    fn report_late(&self) -> ReleaseOutcome {
        warn!(
            key = %self.key,
            expires_at = self.expires_at,
            now = self.clock.now(),
            "released lock too late, lease already expired; leaving store record untouched"
        );
        metrics::record_release(ReleaseOutcome::Expired.as_str());
        ReleaseOutcome::Expired
    }

    async fn delete(&self) -> ReleaseOutcome {
        let outcome = match self.store.delete(&self.store_key).await {
            Ok(true) => {
                debug!(key = %self.key, "released lock");
                ReleaseOutcome::Released
            }
            Ok(false) => {
                debug!(key = %self.key, "lock record already gone at release");
                ReleaseOutcome::AlreadyGone
            }
            Err(e) => {
                error!(key = %self.key, error = %e, "failed to delete lock record");
                metrics::record_store_error("delete");
                ReleaseOutcome::Failed
            }
        };
        metrics::record_release(outcome.as_str());
        outcome
    }
}
