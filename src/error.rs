//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The pool could not produce a usable connection, or a store
    /// command failed at the transport level. Never retried internally.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Explicit deletion of a key that is not present in the store.
    ///
    /// Also used internally to distinguish "not present" from
    /// "present but empty" on reads.
    #[error("Cache miss: {0}")]
    CacheMiss(String),

    /// Encoding or decoding a cached payload failed: unregistered or
    /// unsupported type, a record passed by value, a decode target
    /// mismatched against the stream, or a malformed envelope.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Invalid configuration: malformed store address or an invalid
    /// expiry.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Connectivity(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
