//! Locksmith Core - lease-based mutual exclusion over a shared key-value store
//!
//! This crate provides:
//! - Lease expiry arithmetic and the clock it reads from
//! - The acquisition engine (claim, contention check, takeover, bounded retry)
//! - The release guard that refuses to delete a lease that may have changed hands
//! - The `LeaseStore` capability trait and an in-memory implementation
//! - Metric recording through the `metrics` facade

pub mod config;
pub mod error;
pub mod handle;
pub mod lease;
pub mod locksmith;
pub mod memory;
pub mod metrics;
pub mod store;

// Re-export commonly used types
pub use config::{
    DEFAULT_KEY_PREFIX, DEFAULT_LEASE_TIMEOUT_SECONDS, DEFAULT_MAX_RETRIES, LocksmithConfig,
    RETRY_DELAY,
};
pub use error::{LockError, Result, StoreError, StoreResult};
pub use handle::{LockHandle, ReleaseOutcome};
pub use lease::{Clock, Lease, ManualClock, SystemClock, compute_expiry, is_live};
pub use locksmith::Locksmith;
pub use memory::MemoryLeaseStore;
pub use store::LeaseStore;
