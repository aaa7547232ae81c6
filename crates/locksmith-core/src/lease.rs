//! Lease expiry arithmetic
//!
//! A lease is a whole-second Unix timestamp. The value written to the store and
//! the value later compared against the clock use the same granularity, so there
//! is no sub-second drift between claim and check.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch at which a lease stops being valid.
pub type Lease = i64;

/// Source of the current time in whole seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> Lease;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Lease {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: Lease) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: Lease) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Lease {
        self.now.load(Ordering::SeqCst)
    }
}

/// Expiry of a lease taken at `now` for `lease_seconds`.
pub fn compute_expiry(now: Lease, lease_seconds: u64) -> Lease {
    now.saturating_add(lease_seconds.min(i64::MAX as u64) as i64)
}

/// Whether a lease expiring at `expires_at` is still held at `now`.
pub fn is_live(now: Lease, expires_at: Lease) -> bool {
    now < expires_at
}
