//! Key Builder Module
//!
//! Deterministic mapping from (table, id) and (table, query-text)
//! pairs to namespaced store keys.

use crate::config::CacheConfig;

// == Key Builder ==
/// Builds the namespaced key space for cached beans and query id-lists.
///
/// Beans and query results live under separate category tags so bulk
/// invalidation can target exactly "all cached records for table T" or
/// "all cached query results for table T" independently.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    /// Fixed prefix separating this engine's keys from unrelated keys
    namespace: String,
}

impl KeyBuilder {
    // == Constructor ==
    /// Creates a key builder for the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Creates a key builder from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.namespace.clone())
    }

    /// Returns the namespace prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    // == Bean Keys ==
    /// Key for a single cached record: `{namespace}:bean:{table}:{id}`.
    pub fn bean_key(&self, table: &str, id: &str) -> String {
        format!("{}:bean:{}:{}", self.namespace, table, id)
    }

    // == Query Keys ==
    /// Key for a cached query id-list:
    /// `{namespace}:sql:{table}:{digest}`.
    ///
    /// The query text is digested with CRC-32/IEEE to bound key length.
    /// The digest is not cryptographic and collisions are an accepted
    /// risk. Query text is hashed byte-exact: formatting variants of
    /// the same query cache separately.
    pub fn query_key(&self, table: &str, sql: &str) -> String {
        let crc = crc32fast::hash(sql.as_bytes());
        format!("{}:sql:{}:{}", self.namespace, table, crc)
    }

    // == Invalidation Patterns ==
    /// Glob pattern matching every bean key for a table.
    pub fn bean_pattern(&self, table: &str) -> String {
        format!("{}:bean:{}:*", self.namespace, table)
    }

    /// Glob pattern matching every query id-list key for a table.
    pub fn query_pattern(&self, table: &str) -> String {
        format!("{}:sql:{}:*", self.namespace, table)
    }

    /// Glob pattern matching every key under this engine's namespace.
    ///
    /// Flushing deletes exactly this pattern, never the store's whole
    /// keyspace.
    pub fn all_pattern(&self) -> String {
        format!("{}:*", self.namespace)
    }
}
