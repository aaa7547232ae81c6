// In-memory lease store
// Single-process stand-in for a shared store; each operation is atomic per key
// through DashMap's shard locking.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::StoreResult;
use crate::lease::Lease;
use crate::store::LeaseStore;

/// Lease store backed by a `DashMap`. Keys never expire on their own.
#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    entries: DashMap<String, Lease>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value without going through the async trait.
    pub fn peek(&self, key: &str) -> Option<Lease> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn set_if_absent(&self, key: &str, lease: Lease) -> StoreResult<bool> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(lease);
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Lease>> {
        Ok(self.peek(key))
    }

    async fn get_and_replace(&self, key: &str, lease: Lease) -> StoreResult<Option<Lease>> {
        Ok(self.entries.insert(key.to_string(), lease))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}
