//! Redis-backed lease store
//!
//! Maps the lease capabilities onto single Redis commands, each atomic on the
//! server:
//!
//! | Capability        | Command  |
//! |-------------------|----------|
//! | `set_if_absent`   | `SETNX`  |
//! | `get`             | `GET`    |
//! | `get_and_replace` | `GETSET` |
//! | `delete`          | `DEL`    |
//!
//! Leases travel as decimal text. Every request of the process shares one
//! multiplexed connection through a [`ConnectionManager`], which pairs replies
//! with their requests even when a caller stops waiting, and reconnects after
//! the connection drops.

use async_trait::async_trait;
use locksmith_core::{Lease, LeaseStore, StoreError, StoreResult};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{Client, ConnectionInfo, ErrorKind, IntoConnectionInfo, RedisError};
use tracing::{debug, info, warn};

use crate::config::RedisStoreConfig;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect, authenticate and select the configured database.
    pub async fn connect(config: &RedisStoreConfig) -> StoreResult<Self> {
        let addr = config.addr();
        debug!(addr = %addr, "connecting to Redis");

        let client = Client::open(connection_info(config)?).map_err(store_error)?;
        let manager_config =
            ConnectionManagerConfig::new().set_number_of_retries(config.connect_retries);
        let conn = tokio::time::timeout(
            config.connect_timeout(),
            client.get_connection_manager_with_config(manager_config),
        )
        .await
        .map_err(|_| StoreError::Timeout)?
        .map_err(store_error)?;

        info!(addr = %addr, database = config.database, "Redis lease store connected");
        Ok(Self { conn })
    }

    /// Wrap a connection manager the caller already built.
    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for RedisStore {
    async fn set_if_absent(&self, key: &str, lease: Lease) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        redis::cmd("SETNX")
            .arg(key)
            .arg(lease)
            .query_async(&mut conn)
            .await
            .map_err(store_error)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Lease>> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(raw.map(|raw| parse_lease(key, &raw)))
    }

    async fn get_and_replace(&self, key: &str, lease: Lease) -> StoreResult<Option<Lease>> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = redis::cmd("GETSET")
            .arg(key)
            .arg(lease)
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(raw.map(|raw| parse_lease(key, &raw)))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(removed > 0)
    }
}

fn connection_info(config: &RedisStoreConfig) -> StoreResult<ConnectionInfo> {
    let mut info = (config.host.clone(), config.port)
        .into_connection_info()
        .map_err(store_error)?;
    info.redis.db = i64::from(config.database);
    if config.password.is_some() {
        info.redis.username = config.username.clone();
        info.redis.password = config.password.clone();
    }
    Ok(info)
}

/// A value that is not a timestamp can never compare as live, so it reads as epoch 0.
fn parse_lease(key: &str, raw: &[u8]) -> Lease {
    match std::str::from_utf8(raw).ok().and_then(|s| s.trim().parse().ok()) {
        Some(lease) => lease,
        None => {
            warn!(
                key = %key,
                value = %String::from_utf8_lossy(raw),
                "lock record is not a timestamp, treating it as expired"
            );
            0
        }
    }
}

fn store_error(e: RedisError) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else if e.is_connection_dropped() {
        StoreError::ConnectionClosed
    } else if e.is_io_error() {
        StoreError::Io(std::io::Error::other(e))
    } else if e.kind() == ErrorKind::TypeError {
        StoreError::Protocol(e.to_string())
    } else {
        StoreError::Server(e.to_string())
    }
}
