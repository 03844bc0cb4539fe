//! Value Codec Module
//!
//! Encodes typed values into self-describing byte payloads and
//! reconstructs them, without compile-time knowledge of every record
//! type flowing through the cache.

mod envelope;
mod probe;
mod registry;


pub use envelope::{Envelope, Shape};
pub use registry::TypeRegistry;

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

// == Decoded ==
/// Result of infer-mode decoding.
///
/// Record-shaped streams come back as an owned boxed value, symmetric
/// with the reference the encoder was given. Everything else comes
/// back as a dynamic value preserving sequence order and mapping key
/// presence.
pub enum Decoded {
    /// A reconstructed record behind an owning pointer
    Record(Box<dyn Any + Send>),
    /// A dynamic scalar, sequence, or mapping
    Value(serde_json::Value),
}

impl Decoded {
    /// Consumes the decoded record, downcasting it to a concrete type.
    pub fn downcast<T: Any>(self) -> Result<Box<T>> {
        match self {
            Decoded::Record(boxed) => boxed.downcast::<T>().map_err(|_| {
                CacheError::Codec(format!(
                    "decoded record is not a {}",
                    std::any::type_name::<T>()
                ))
            }),
            Decoded::Value(_) => Err(CacheError::Codec(
                "decoded payload is not a record".to_string(),
            )),
        }
    }

    /// Borrows the decoded record as a concrete type, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Decoded::Record(boxed) => boxed.downcast_ref::<T>(),
            Decoded::Value(_) => None,
        }
    }

    /// Borrows the dynamic value, if the payload was not a record.
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Decoded::Record(_) => None,
            Decoded::Value(value) => Some(value),
        }
    }

    /// Consumes the dynamic value, if the payload was not a record.
    pub fn into_value(self) -> Option<serde_json::Value> {
        match self {
            Decoded::Record(_) => None,
            Decoded::Value(value) => Some(value),
        }
    }

    /// Returns true when the payload was record-shaped.
    pub fn is_record(&self) -> bool {
        matches!(self, Decoded::Record(_))
    }
}

impl fmt::Debug for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoded::Record(_) => f.write_str("Decoded::Record(..)"),
            Decoded::Value(value) => write!(f, "Decoded::Value({})", value),
        }
    }
}

// == Value Codec ==
/// Serializes typed values to self-describing payloads and back.
///
/// The codec owns its type registry; there is no process-global state.
#[derive(Debug, Default)]
pub struct ValueCodec {
    registry: TypeRegistry,
}

impl ValueCodec {
    // == Constructor ==
    /// Creates a codec with an empty type registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codec around a pre-warmed registry.
    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    /// Returns the codec's type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    // == Encode ==
    /// Encodes a value behind a reference.
    ///
    /// This is the canonical path for records: the concrete type must
    /// have been registered first, so a later infer-mode decode can
    /// reconstruct an owned value of the same type. Sequences,
    /// mappings, and scalars need no registration.
    pub fn encode<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let shape = probe::shape_of(value)?;
        let type_name = std::any::type_name::<T>();

        if shape == Shape::Record && !self.registry.contains(type_name) {
            return Err(CacheError::Codec(format!(
                "unhandled type: {} is not registered",
                type_name
            )));
        }

        let payload = serde_json::to_value(value)
            .map_err(|err| CacheError::Codec(format!("encoding {} failed: {}", type_name, err)))?;

        Envelope {
            shape,
            type_name: type_name.to_string(),
            payload,
        }
        .to_bytes()
    }

    /// Encodes an owned scalar or container.
    ///
    /// Records are rejected here: they must travel by reference so the
    /// decode side can hand back an owning pointer symmetric with the
    /// input, and so the cache never copies record values around.
    pub fn encode_owned<T>(&self, value: T) -> Result<Vec<u8>>
    where
        T: Serialize,
    {
        let shape = probe::shape_of(&value)?;
        if shape == Shape::Record {
            return Err(CacheError::Codec(format!(
                "record type {} must be encoded by reference",
                std::any::type_name::<T>()
            )));
        }
        self.encode(&value)
    }

    // == Decode ==
    /// Infer-mode decode: reconstructs a value using only the
    /// information embedded in the byte stream.
    ///
    /// Record-shaped streams are rebuilt through the registry factory
    /// for the embedded type name. Prefer [`ValueCodec::decode_into`]
    /// when a target type is available.
    pub fn decode(&self, bytes: &[u8]) -> Result<Decoded> {
        let envelope = Envelope::from_bytes(bytes)?;
        match envelope.shape {
            Shape::Record => {
                let boxed = self.registry.decode(&envelope.type_name, envelope.payload)?;
                Ok(Decoded::Record(boxed))
            }
            Shape::Seq | Shape::Map | Shape::Scalar => Ok(Decoded::Value(envelope.payload)),
        }
    }

    /// Decode-into: reconstructs directly into a caller-supplied
    /// target. The canonical, recommended path.
    ///
    /// Either fully succeeds, or returns an error and leaves the
    /// target's prior state untouched. A record stream whose encoded
    /// type differs from the target type is a codec error.
    pub fn decode_into<T>(&self, bytes: &[u8], target: &mut T) -> Result<()>
    where
        T: DeserializeOwned,
    {
        let envelope = Envelope::from_bytes(bytes)?;
        let target_name = std::any::type_name::<T>();

        if envelope.shape == Shape::Record && envelope.type_name != target_name {
            return Err(CacheError::Codec(format!(
                "decode target mismatch: stream holds {}, target is {}",
                envelope.type_name, target_name
            )));
        }

        let decoded: T = serde_json::from_value(envelope.payload).map_err(|err| {
            CacheError::Codec(format!("decoding into {} failed: {}", target_name, err))
        })?;

        *target = decoded;
        Ok(())
    }
}
