//! Configuration Module
//!
//! Handles loading and validating cache engine configuration.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default store address when none is configured.
pub const DEFAULT_ADDR: &str = "127.0.0.1:6379";

/// Default namespace prefix separating this engine's keys from
/// unrelated keys in a shared store.
pub const DEFAULT_NAMESPACE: &str = "rowcache";

/// Default maximum number of idle pooled connections.
pub const DEFAULT_MAX_IDLE: usize = 5;

/// Default idle timeout in seconds before a pooled connection is closed.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 240;

// == Expiry ==
/// Expiration attribute of a write operation.
///
/// Expiry belongs to the write, not to the key: the store enforces it
/// and the engine holds no independent expiry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Use the process-default TTL from the configuration.
    Default,
    /// Store without expiry.
    Never,
    /// Store with an explicit TTL. Must resolve to at least one second.
    After(Duration),
}

impl Expiry {
    /// Resolves this expiry against the configured default TTL.
    ///
    /// Returns the TTL in whole seconds, or None when the value should
    /// be stored without expiry.
    pub fn resolve(&self, default_ttl: Option<Duration>) -> Result<Option<u64>> {
        let effective = match self {
            Expiry::Default => default_ttl,
            Expiry::Never => None,
            Expiry::After(d) => Some(*d),
        };

        match effective {
            Some(d) => {
                let secs = d.as_secs();
                if secs == 0 {
                    return Err(CacheError::Configuration(
                        "explicit TTL must be at least one second".to_string(),
                    ));
                }
                Ok(Some(secs))
            }
            None => Ok(None),
        }
    }
}

// == Cache Config ==
/// Cache engine configuration.
///
/// All values can be loaded from environment variables with sensible
/// defaults, or set explicitly.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store address as `host:port`
    pub addr: String,
    /// Optional shared secret for the AUTH handshake
    pub password: Option<String>,
    /// Default TTL applied by `Expiry::Default` writes (None = no expiry)
    pub default_ttl: Option<Duration>,
    /// Namespace prefix for every key this engine writes
    pub namespace: String,
    /// Maximum number of idle pooled connections
    pub max_idle: usize,
    /// Idle duration after which a pooled connection is closed
    pub idle_timeout: Duration,
}

impl CacheConfig {
    /// Creates a configuration for the given store address with
    /// defaults for everything else.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    /// Creates a CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `ROWCACHE_ADDR` - Store address (default: 127.0.0.1:6379)
    /// - `ROWCACHE_PASSWORD` - AUTH secret (default: none)
    /// - `ROWCACHE_DEFAULT_TTL` - Default TTL in seconds, 0 = no expiry (default: 0)
    /// - `ROWCACHE_NAMESPACE` - Key namespace prefix (default: rowcache)
    /// - `ROWCACHE_MAX_IDLE` - Maximum idle connections (default: 5)
    /// - `ROWCACHE_IDLE_TIMEOUT` - Idle timeout in seconds (default: 240)
    pub fn from_env() -> Self {
        let default_ttl = env::var("ROWCACHE_DEFAULT_TTL")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            addr: env::var("ROWCACHE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string()),
            password: env::var("ROWCACHE_PASSWORD").ok().filter(|p| !p.is_empty()),
            default_ttl,
            namespace: env::var("ROWCACHE_NAMESPACE")
                .unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string()),
            max_idle: env::var("ROWCACHE_MAX_IDLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_IDLE),
            idle_timeout: env::var("ROWCACHE_IDLE_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)),
        }
    }

    /// Sets the AUTH password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the default TTL applied by `Expiry::Default` writes.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Sets the namespace prefix.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the idle-connection bounds of the transport pool.
    pub fn with_pool(mut self, max_idle: usize, idle_timeout: Duration) -> Self {
        self.max_idle = max_idle;
        self.idle_timeout = idle_timeout;
        self
    }

    /// Validates the configuration.
    ///
    /// Checks that the store address is a well-formed `host:port` pair,
    /// that the namespace is non-empty, and that the default TTL is at
    /// least one second when set.
    pub fn validate(&self) -> Result<()> {
        let (host, port) = self
            .addr
            .rsplit_once(':')
            .ok_or_else(|| malformed_addr(&self.addr))?;
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(malformed_addr(&self.addr));
        }

        if self.namespace.is_empty() {
            return Err(CacheError::Configuration(
                "namespace must not be empty".to_string(),
            ));
        }

        if let Some(ttl) = self.default_ttl {
            if ttl.as_secs() == 0 {
                return Err(CacheError::Configuration(
                    "default TTL must be at least one second".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn malformed_addr(addr: &str) -> CacheError {
    CacheError::Configuration(format!("malformed store address: {:?}", addr))
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            password: None,
            default_ttl: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_idle: DEFAULT_MAX_IDLE,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}
