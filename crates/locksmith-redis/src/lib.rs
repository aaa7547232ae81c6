//! Locksmith Redis - lease store on a Redis server
//!
//! This crate provides:
//! - `RedisStore`, a `LeaseStore` over a reconnecting `redis` connection manager
//! - `RedisStoreConfig` for host, port, credentials and database selection

pub mod config;
pub mod store;

pub use config::RedisStoreConfig;
pub use store::RedisStore;
