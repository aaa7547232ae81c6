//! Lock engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_KEY_PREFIX: &str = "__locksmith:";
pub const DEFAULT_LEASE_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 100;

/// Fixed pause between contended attempts. Not derived from the lease timeout.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Immutable engine settings shared by every acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocksmithConfig {
    /// Prepended to every lock key to form the store key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Lease length used by [`crate::Locksmith::lock`]
    #[serde(default = "default_lease_timeout_seconds")]
    pub lease_timeout_seconds: u64,
    /// Retry budget used by [`crate::Locksmith::lock`]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_lease_timeout_seconds() -> u64 {
    DEFAULT_LEASE_TIMEOUT_SECONDS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for LocksmithConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            lease_timeout_seconds: default_lease_timeout_seconds(),
            max_retries: default_max_retries(),
        }
    }
}

impl LocksmithConfig {
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_lease_timeout(mut self, seconds: u64) -> Self {
        self.lease_timeout_seconds = seconds;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Store key for a lock key. Equal lock keys always map to the same store key.
    pub fn store_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}
