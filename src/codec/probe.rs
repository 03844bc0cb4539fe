//! Shape Probe Module
//!
//! A serializer that reports only the top-level shape of a value,
//! without serializing its contents. This is how the codec tells
//! records apart from mappings before committing to an envelope.

use std::fmt;

use serde::ser::{self, Serialize};

use crate::codec::envelope::Shape;
use crate::error::{CacheError, Result};

/// Returns the top-level shape of a serializable value.
pub fn shape_of<T: Serialize + ?Sized>(value: &T) -> Result<Shape> {
    value
        .serialize(ShapeProbe)
        .map_err(|err| CacheError::Codec(err.to_string()))
}

// == Probe Error ==
#[derive(Debug)]
pub struct ProbeError(String);

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape probe failed: {}", self.0)
    }
}

impl std::error::Error for ProbeError {}

impl ser::Error for ProbeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ProbeError(msg.to_string())
    }
}

// == Shape Probe ==
/// Serializer producing a `Shape` instead of bytes.
///
/// Compound values stop at the first level: elements and fields are
/// never visited.
struct ShapeProbe;

/// Sink for compound types; records the shape decided at entry and
/// ignores every element.
struct ShapeSink(Shape);

macro_rules! scalar {
    ($method:ident, $ty:ty) => {
        fn $method(self, _v: $ty) -> std::result::Result<Shape, ProbeError> {
            Ok(Shape::Scalar)
        }
    };
}

impl ser::Serializer for ShapeProbe {
    type Ok = Shape;
    type Error = ProbeError;

    type SerializeSeq = ShapeSink;
    type SerializeTuple = ShapeSink;
    type SerializeTupleStruct = ShapeSink;
    type SerializeTupleVariant = ShapeSink;
    type SerializeMap = ShapeSink;
    type SerializeStruct = ShapeSink;
    type SerializeStructVariant = ShapeSink;

    scalar!(serialize_bool, bool);
    scalar!(serialize_i8, i8);
    scalar!(serialize_i16, i16);
    scalar!(serialize_i32, i32);
    scalar!(serialize_i64, i64);
    scalar!(serialize_u8, u8);
    scalar!(serialize_u16, u16);
    scalar!(serialize_u32, u32);
    scalar!(serialize_u64, u64);
    scalar!(serialize_f32, f32);
    scalar!(serialize_f64, f64);
    scalar!(serialize_char, char);
    scalar!(serialize_str, &str);

    fn serialize_bytes(self, _v: &[u8]) -> std::result::Result<Shape, ProbeError> {
        Ok(Shape::Seq)
    }

    fn serialize_none(self) -> std::result::Result<Shape, ProbeError> {
        Ok(Shape::Scalar)
    }

    fn serialize_some<T>(self, value: &T) -> std::result::Result<Shape, ProbeError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(ShapeProbe)
    }

    fn serialize_unit(self) -> std::result::Result<Shape, ProbeError> {
        Ok(Shape::Scalar)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> std::result::Result<Shape, ProbeError> {
        Ok(Shape::Scalar)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> std::result::Result<Shape, ProbeError> {
        Ok(Shape::Scalar)
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> std::result::Result<Shape, ProbeError>
    where
        T: Serialize + ?Sized,
    {
        // Transparent wrapper; probe the inner value
        value.serialize(ShapeProbe)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> std::result::Result<Shape, ProbeError>
    where
        T: Serialize + ?Sized,
    {
        Ok(Shape::Record)
    }

    fn serialize_seq(
        self,
        _len: Option<usize>,
    ) -> std::result::Result<Self::SerializeSeq, ProbeError> {
        Ok(ShapeSink(Shape::Seq))
    }

    fn serialize_tuple(self, _len: usize) -> std::result::Result<Self::SerializeTuple, ProbeError> {
        Ok(ShapeSink(Shape::Seq))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleStruct, ProbeError> {
        Ok(ShapeSink(Shape::Seq))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleVariant, ProbeError> {
        Ok(ShapeSink(Shape::Record))
    }

    fn serialize_map(
        self,
        _len: Option<usize>,
    ) -> std::result::Result<Self::SerializeMap, ProbeError> {
        Ok(ShapeSink(Shape::Map))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStruct, ProbeError> {
        Ok(ShapeSink(Shape::Record))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStructVariant, ProbeError> {
        Ok(ShapeSink(Shape::Record))
    }
}

impl ser::SerializeSeq for ShapeSink {
    type Ok = Shape;
    type Error = ProbeError;

    fn serialize_element<T>(&mut self, _value: &T) -> std::result::Result<(), ProbeError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> std::result::Result<Shape, ProbeError> {
        Ok(self.0)
    }
}

impl ser::SerializeTuple for ShapeSink {
    type Ok = Shape;
    type Error = ProbeError;

    fn serialize_element<T>(&mut self, _value: &T) -> std::result::Result<(), ProbeError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> std::result::Result<Shape, ProbeError> {
        Ok(self.0)
    }
}

impl ser::SerializeTupleStruct for ShapeSink {
    type Ok = Shape;
    type Error = ProbeError;

    fn serialize_field<T>(&mut self, _value: &T) -> std::result::Result<(), ProbeError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> std::result::Result<Shape, ProbeError> {
        Ok(self.0)
    }
}

impl ser::SerializeTupleVariant for ShapeSink {
    type Ok = Shape;
    type Error = ProbeError;

    fn serialize_field<T>(&mut self, _value: &T) -> std::result::Result<(), ProbeError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> std::result::Result<Shape, ProbeError> {
        Ok(self.0)
    }
}

impl ser::SerializeMap for ShapeSink {
    type Ok = Shape;
    type Error = ProbeError;

    fn serialize_key<T>(&mut self, _key: &T) -> std::result::Result<(), ProbeError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn serialize_value<T>(&mut self, _value: &T) -> std::result::Result<(), ProbeError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> std::result::Result<Shape, ProbeError> {
        Ok(self.0)
    }
}

impl ser::SerializeStruct for ShapeSink {
    type Ok = Shape;
    type Error = ProbeError;

    fn serialize_field<T>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> std::result::Result<(), ProbeError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> std::result::Result<Shape, ProbeError> {
        Ok(self.0)
    }
}

impl ser::SerializeStructVariant for ShapeSink {
    type Ok = Shape;
    type Error = ProbeError;

    fn serialize_field<T>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> std::result::Result<(), ProbeError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> std::result::Result<Shape, ProbeError> {
        Ok(self.0)
    }
}
