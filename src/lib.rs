//! Rowcache - a Redis-backed second-level cache for ORM lookups
//!
//! Sits between a relational-mapping engine and a remote key-value
//! store, caching individual records ("beans") and query-result
//! id-lists to avoid redundant database round-trips.

pub mod cacher;
pub mod codec;
pub mod config;
pub mod error;
pub mod invalidate;
pub mod keys;
pub mod stats;
pub mod tasks;
pub mod transport;

pub use cacher::RowCache;
pub use codec::{Decoded, TypeRegistry, ValueCodec};
pub use config::{CacheConfig, Expiry};
pub use error::{CacheError, Result};
pub use keys::KeyBuilder;
pub use stats::CacheStats;
pub use tasks::spawn_reaper_task;
pub use transport::{Connection, TransportPool};
