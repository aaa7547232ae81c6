//! Capability interface the lock protocol needs from a key-value store
//!
//! Every operation must be atomic with respect to the others for the same key.
//! No multi-key transactions are required.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::lease::Lease;

#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Store `lease` at `key` only if the key has no value. Returns whether it was set.
    async fn set_if_absent(&self, key: &str, lease: Lease) -> StoreResult<bool>;

    /// Current lease at `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Lease>>;

    /// Write `lease` at `key` unconditionally, returning the value it replaced.
    async fn get_and_replace(&self, key: &str, lease: Lease) -> StoreResult<Option<Lease>>;

    /// Remove `key`. Returns whether a value was present.
    async fn delete(&self, key: &str) -> StoreResult<bool>;
}
