//! Type Registry Module
//!
//! Explicit registry of concrete record types, mapping a type name to
//! a factory that reconstructs an owned value from a decoded payload.
//! Owned by the codec instance rather than hidden in process globals.

use std::any::Any;
use std::collections::HashMap;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CacheError, Result};

/// Factory reconstructing one concrete type from its payload.
type DecodeFn = fn(Value) -> std::result::Result<Box<dyn Any + Send>, serde_json::Error>;

// == Type Registry ==
/// Thread-safe, idempotent registry of decodable record types.
///
/// Registration stores a monomorphized deserializer per type, so
/// infer-mode decoding allocates a fresh owned value through safe
/// code only.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    factories: RwLock<HashMap<&'static str, DecodeFn>>,
}

impl TypeRegistry {
    // == Constructor ==
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Registers a concrete record type.
    ///
    /// Idempotent; safe to call repeatedly for the same type.
    pub fn register<T>(&self)
    where
        T: DeserializeOwned + Send + 'static,
    {
        let name = std::any::type_name::<T>();
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.entry(name).or_insert(decode_as::<T>);
    }

    /// Checks whether a type name has been registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(type_name)
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Returns true if no types have been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Decode ==
    /// Reconstructs an owned value of the named type from a payload.
    pub fn decode(&self, type_name: &str, payload: Value) -> Result<Box<dyn Any + Send>> {
        let factory = {
            let factories = self
                .factories
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            factories.get(type_name).copied()
        };

        let factory = factory.ok_or_else(|| {
            CacheError::Codec(format!("unhandled type in stream: {}", type_name))
        })?;

        factory(payload)
            .map_err(|err| CacheError::Codec(format!("decoding {} failed: {}", type_name, err)))
    }
}

fn decode_as<T>(payload: Value) -> std::result::Result<Box<dyn Any + Send>, serde_json::Error>
where
    T: DeserializeOwned + Send + 'static,
{
    Ok(Box::new(serde_json::from_value::<T>(payload)?))
}
