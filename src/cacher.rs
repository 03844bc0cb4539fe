//! Cache Façade Module
//!
//! The public capability set consumed by the mapping engine:
//! bean and query-id reads/writes, scoped bulk invalidation, and a
//! namespace flush. Coordinates the key builder, value codec, and
//! transport pool; every call is one or two store round-trips with no
//! in-process memoization.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::codec::{Decoded, ValueCodec};
use crate::config::{CacheConfig, Expiry};
use crate::error::{CacheError, Result};
use crate::invalidate;
use crate::keys::KeyBuilder;
use crate::stats::{CacheStats, StatsRecorder};
use crate::transport::TransportPool;

// == Row Cache ==
/// Redis-backed second-level cache for ORM lookups.
///
/// Holds no cached state in-process: all shared state lives in the
/// remote store, and concurrent callers each borrow their own pooled
/// connection.
#[derive(Debug)]
pub struct RowCache {
    pool: Arc<TransportPool>,
    keys: KeyBuilder,
    codec: ValueCodec,
    default_ttl: Option<Duration>,
    stats: StatsRecorder,
}

impl RowCache {
    // == Constructor ==
    /// Creates a cache handle from a validated configuration.
    ///
    /// No connection is made until the first operation.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: Arc::new(TransportPool::new(&config)),
            keys: KeyBuilder::from_config(&config),
            codec: ValueCodec::new(),
            default_ttl: config.default_ttl,
            stats: StatsRecorder::new(),
        })
    }

    /// Registers a record type with the codec's type registry.
    ///
    /// Idempotent. Record types must be registered before their first
    /// write; infer-mode reads reconstruct through the same registry.
    pub fn register<T>(&self)
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.codec.registry().register::<T>();
    }

    /// Returns the shared transport pool, for wiring a background
    /// reaper task.
    pub fn pool(&self) -> Arc<TransportPool> {
        Arc::clone(&self.pool)
    }

    /// Returns the key builder for this cache's namespace.
    pub fn key_builder(&self) -> &KeyBuilder {
        &self.keys
    }

    /// Returns a snapshot of this handle's hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Bean Operations ==
    /// Fetches a cached record, reconstructing it from stream-embedded
    /// type information. Returns None on a miss.
    pub async fn get_bean(&self, table: &str, id: &str) -> Result<Option<Decoded>> {
        let key = self.keys.bean_key(table, id);
        match self.get_raw(&key).await? {
            Some(payload) => {
                let decoded = self.codec.decode(&payload)?;
                debug!(table, id, key = %key, "bean hit");
                Ok(Some(decoded))
            }
            None => {
                debug!(table, id, key = %key, "bean miss");
                Ok(None)
            }
        }
    }

    /// Fetches a cached record directly into a caller-supplied target.
    ///
    /// Returns whether the record was found. On any decode failure the
    /// target keeps its prior state. This is the preferred read path.
    pub async fn get_bean_into<T>(&self, table: &str, id: &str, target: &mut T) -> Result<bool>
    where
        T: DeserializeOwned,
    {
        let key = self.keys.bean_key(table, id);
        match self.get_raw(&key).await? {
            Some(payload) => {
                self.codec.decode_into(&payload, target)?;
                debug!(table, id, key = %key, target_type = std::any::type_name::<T>(), "bean hit");
                Ok(true)
            }
            None => {
                debug!(table, id, key = %key, "bean miss");
                Ok(false)
            }
        }
    }

    /// Caches a record under the process-default expiry.
    pub async fn put_bean<T>(&self, table: &str, id: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.put_bean_with(table, id, value, Expiry::Default).await
    }

    /// Caches a record with an explicit expiry. Writes always replace.
    pub async fn put_bean_with<T>(
        &self,
        table: &str,
        id: &str,
        value: &T,
        expiry: Expiry,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self.keys.bean_key(table, id);
        debug!(table, id, key = %key, value_type = std::any::type_name::<T>(), "put bean");
        let payload = self.codec.encode(value)?;
        self.put_raw(&key, &payload, expiry).await
    }

    /// Deletes a cached record.
    ///
    /// Deleting an absent key is a cache-miss error so callers can
    /// detect stale invalidation assumptions.
    pub async fn delete_bean(&self, table: &str, id: &str) -> Result<()> {
        let key = self.keys.bean_key(table, id);
        debug!(table, id, key = %key, "delete bean");
        self.delete_raw(&key).await
    }

    // == Query Id-List Operations ==
    /// Fetches the cached id-list for a query. Returns None on a miss.
    ///
    /// Query text is matched byte-exact; formatting variants of the
    /// same query are distinct cache entries.
    pub async fn get_query_ids(&self, table: &str, sql: &str) -> Result<Option<Decoded>> {
        let key = self.keys.query_key(table, sql);
        match self.get_raw(&key).await? {
            Some(payload) => {
                let decoded = self.codec.decode(&payload)?;
                debug!(table, key = %key, "query ids hit");
                Ok(Some(decoded))
            }
            None => {
                debug!(table, key = %key, "query ids miss");
                Ok(None)
            }
        }
    }

    /// Fetches the cached id-list for a query directly into a
    /// caller-supplied target. Returns whether the list was found.
    pub async fn get_query_ids_into<T>(&self, table: &str, sql: &str, target: &mut T) -> Result<bool>
    where
        T: DeserializeOwned,
    {
        let key = self.keys.query_key(table, sql);
        match self.get_raw(&key).await? {
            Some(payload) => {
                self.codec.decode_into(&payload, target)?;
                debug!(table, key = %key, "query ids hit");
                Ok(true)
            }
            None => {
                debug!(table, key = %key, "query ids miss");
                Ok(false)
            }
        }
    }

    /// Caches a query's id-list under the process-default expiry.
    pub async fn put_query_ids<T>(&self, table: &str, sql: &str, ids: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.put_query_ids_with(table, sql, ids, Expiry::Default).await
    }

    /// Caches a query's id-list with an explicit expiry.
    pub async fn put_query_ids_with<T>(
        &self,
        table: &str,
        sql: &str,
        ids: &T,
        expiry: Expiry,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self.keys.query_key(table, sql);
        debug!(table, key = %key, value_type = std::any::type_name::<T>(), "put query ids");
        let payload = self.codec.encode(ids)?;
        self.put_raw(&key, &payload, expiry).await
    }

    /// Deletes a query's cached id-list; absent is a cache-miss error.
    pub async fn delete_query_ids(&self, table: &str, sql: &str) -> Result<()> {
        let key = self.keys.query_key(table, sql);
        debug!(table, key = %key, "delete query ids");
        self.delete_raw(&key).await
    }

    // == Bulk Invalidation ==
    /// Deletes every cached record for a table. Query id-lists and
    /// other tables are untouched. Returns the number of keys removed.
    pub async fn clear_beans(&self, table: &str) -> Result<usize> {
        let pattern = self.keys.bean_pattern(table);
        info!(table, pattern = %pattern, "clearing beans");
        self.clear_matching(&pattern).await
    }

    /// Deletes every cached query id-list for a table. Beans and other
    /// tables are untouched. Returns the number of keys removed.
    pub async fn clear_query_ids(&self, table: &str) -> Result<usize> {
        let pattern = self.keys.query_pattern(table);
        info!(table, pattern = %pattern, "clearing query ids");
        self.clear_matching(&pattern).await
    }

    /// Deletes every key under this engine's namespace.
    ///
    /// The store's keyspace may be shared; flushing scans the
    /// namespace pattern and never issues a store-wide wipe.
    pub async fn flush(&self) -> Result<usize> {
        let pattern = self.keys.all_pattern();
        info!(pattern = %pattern, "flushing cache namespace");
        self.clear_matching(&pattern).await
    }

    // == Raw Store Operations ==
    /// Reads a payload. None is an absent key; a present empty payload
    /// comes back as Some and is never treated as a miss.
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.pool.acquire().await?;
        match conn.get(key).await {
            Ok(payload) => {
                self.pool.release(conn).await;
                if payload.is_some() {
                    self.stats.record_hit();
                } else {
                    self.stats.record_miss();
                }
                Ok(payload)
            }
            // A connection that failed mid-command is dropped, not pooled
            Err(err) => Err(err),
        }
    }

    async fn put_raw(&self, key: &str, payload: &[u8], expiry: Expiry) -> Result<()> {
        let ttl = expiry.resolve(self.default_ttl)?;
        let mut conn = self.pool.acquire().await?;
        let result = match ttl {
            Some(seconds) => conn.setex(key, seconds, payload).await,
            None => conn.set(key, payload).await,
        };
        match result {
            Ok(()) => {
                self.pool.release(conn).await;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn delete_raw(&self, key: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        let present = match conn.exists(key).await {
            Ok(present) => present,
            Err(err) => return Err(err),
        };
        if !present {
            // The connection is still healthy; only the key is gone
            self.pool.release(conn).await;
            return Err(CacheError::CacheMiss(key.to_string()));
        }

        match conn.del(key).await {
            Ok(_) => {
                self.pool.release(conn).await;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn clear_matching(&self, pattern: &str) -> Result<usize> {
        let mut conn = self.pool.acquire().await?;
        match invalidate::delete_matching(&mut conn, pattern).await {
            Ok(removed) => {
                self.pool.release(conn).await;
                Ok(removed)
            }
            Err(err) => Err(err),
        }
    }
}
