//! Payload Envelope Module
//!
//! Self-describing wire form for cached values: a shape tag, the
//! concrete type name, and the serialized payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Shape ==
/// Top-level shape of an encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// A struct-like record (requires registration to reconstruct)
    Record,
    /// A sequence; element order is preserved
    Seq,
    /// A string-keyed mapping; key presence is preserved
    Map,
    /// A primitive scalar
    Scalar,
}

// == Envelope ==
/// The byte layout stored under every cache key.
///
/// Carries enough type information for a reader to reconstruct the
/// value without being handed a target type, while remaining decodable
/// into a caller-supplied target as well.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Top-level shape of the payload
    pub shape: Shape,
    /// Concrete type name recorded at encode time
    #[serde(rename = "type")]
    pub type_name: String,
    /// The serialized value itself
    pub payload: Value,
}

impl Envelope {
    /// Serializes the envelope to its stored byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|err| CacheError::Codec(format!("envelope encoding failed: {}", err)))
    }

    /// Parses an envelope back from stored bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|err| CacheError::Codec(format!("malformed envelope: {}", err)))
    }
}
