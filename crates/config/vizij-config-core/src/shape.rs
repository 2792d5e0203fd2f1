//! Structural shape of a deserializable type.
//!
//! serde exposes no reflection, but every `Deserialize` impl announces what it
//! expects through the `deserialize_*` hint it calls first. Running the impl
//! against [`Probe`] records that hint and aborts before any data is read, so a
//! derived struct reports its name and serde field names (after `rename` /
//! `rename_all`) without a value ever being built.
//!
//! Caveat: `#[serde(flatten)]` makes a struct ask for a map, so such structs are
//! reported as [`TypeShape::Map`].
//!
//! `SerializedFields` is the mirror image for `Serialize`: it records which
//! keys a struct value writes, and which it skips conditionally.

use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::ser::{self, Impossible, Serialize, Serializer};
use std::fmt;

use crate::error::Error;

/// Field layout of a struct-shaped type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructShape {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

impl StructShape {
    /// Probe `T` and require it to be struct-shaped.
    pub fn of<T: DeserializeOwned>() -> Result<Self, Error> {
        match TypeShape::of::<T>() {
            TypeShape::Struct(shape) => Ok(shape),
            other => Err(Error::unsupported::<T>(format!(
                "expected a struct, found {}",
                other.kind_name()
            ))),
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| *f == name)
    }
}

/// Coarse shape of a type as announced by its `Deserialize` impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    Struct(StructShape),
    Map,
    Sequence,
    Enum { name: &'static str },
    Option,
    Newtype { name: &'static str },
    Scalar,
    /// The impl asked for `deserialize_any` (e.g. `serde_json::Value`,
    /// untagged enums) and gave no structural hint.
    SelfDescribing,
}

impl TypeShape {
    pub fn of<T: DeserializeOwned>() -> Self {
        match T::deserialize(Probe) {
            Err(Signal::Shape(shape)) => shape,
            // A hand-written impl that fails or succeeds without hinting.
            Err(Signal::Custom(_)) | Ok(_) => TypeShape::SelfDescribing,
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, TypeShape::Struct(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeShape::Struct(_) => "struct",
            TypeShape::Map => "map",
            TypeShape::Sequence => "sequence",
            TypeShape::Enum { .. } => "enum",
            TypeShape::Option => "option",
            TypeShape::Newtype { .. } => "newtype",
            TypeShape::Scalar => "scalar",
            TypeShape::SelfDescribing => "self-describing value",
        }
    }
}

#[derive(Debug)]
pub(crate) enum Signal {
    Shape(TypeShape),
    Custom(String),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Shape(shape) => write!(f, "probed {}", shape.kind_name()),
            Signal::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Signal {}

impl de::Error for Signal {
    fn custom<M: fmt::Display>(msg: M) -> Self {
        Signal::Custom(msg.to_string())
    }
}

impl ser::Error for Signal {
    fn custom<M: fmt::Display>(msg: M) -> Self {
        Signal::Custom(msg.to_string())
    }
}

/// Keys a struct value's `Serialize` impl hands to the serializer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SerializedFields {
    written: Vec<&'static str>,
    // `skip_serializing_if` fields that were skipped this time.
    skipped: Vec<&'static str>,
}

impl SerializedFields {
    pub(crate) fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        value
            .serialize(Recorder)
            .map_err(|signal| Error::unsupported::<T>(signal.to_string()))
    }

    /// Written or conditionally skipped. A field that is neither is never
    /// serialized at all.
    pub(crate) fn covers(&self, name: &str) -> bool {
        self.written.iter().chain(&self.skipped).any(|f| *f == name)
    }
}

impl ser::SerializeStruct for SerializedFields {
    type Ok = SerializedFields;
    type Error = Signal;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        _value: &T,
    ) -> Result<(), Signal> {
        self.written.push(key);
        Ok(())
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), Signal> {
        self.skipped.push(key);
        Ok(())
    }

    fn end(self) -> Result<SerializedFields, Signal> {
        Ok(self)
    }
}

fn serializes_as(kind: &str) -> Signal {
    Signal::Custom(format!("expected a struct to serialize, found {kind}"))
}

struct Recorder;

macro_rules! record_scalar {
    ($($method:ident($ty:ty))*) => {
        $(
            fn $method(self, _v: $ty) -> Result<SerializedFields, Signal> {
                Err(serializes_as("scalar"))
            }
        )*
    };
}

impl Serializer for Recorder {
    type Ok = SerializedFields;
    type Error = Signal;
    type SerializeSeq = Impossible<SerializedFields, Signal>;
    type SerializeTuple = Impossible<SerializedFields, Signal>;
    type SerializeTupleStruct = Impossible<SerializedFields, Signal>;
    type SerializeTupleVariant = Impossible<SerializedFields, Signal>;
    type SerializeMap = Impossible<SerializedFields, Signal>;
    type SerializeStruct = SerializedFields;
    type SerializeStructVariant = Impossible<SerializedFields, Signal>;

    record_scalar!(
        serialize_bool(bool) serialize_i8(i8) serialize_i16(i16) serialize_i32(i32)
        serialize_i64(i64) serialize_u8(u8) serialize_u16(u16) serialize_u32(u32)
        serialize_u64(u64) serialize_f32(f32) serialize_f64(f64) serialize_char(char)
        serialize_str(&str) serialize_bytes(&[u8]));

    fn serialize_none(self) -> Result<SerializedFields, Signal> {
        Err(serializes_as("option"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<SerializedFields, Signal> {
        Err(serializes_as("option"))
    }

    fn serialize_unit(self) -> Result<SerializedFields, Signal> {
        Err(serializes_as("scalar"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<SerializedFields, Signal> {
        Err(serializes_as("scalar"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<SerializedFields, Signal> {
        Err(serializes_as("enum"))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> Result<SerializedFields, Signal> {
        Err(serializes_as("newtype"))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<SerializedFields, Signal> {
        Err(serializes_as("enum"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Signal> {
        Err(serializes_as("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Signal> {
        Err(serializes_as("sequence"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Signal> {
        Err(serializes_as("sequence"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Signal> {
        Err(serializes_as("enum"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Signal> {
        Err(serializes_as("map"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Signal> {
        Ok(SerializedFields::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Signal> {
        Err(serializes_as("enum"))
    }
}

struct Probe;

macro_rules! probe_as {
    ($shape:expr; $($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Signal> {
                Err(Signal::Shape($shape))
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Probe {
    type Error = Signal;

    probe_as!(TypeShape::SelfDescribing; deserialize_any deserialize_ignored_any);
    probe_as!(TypeShape::Scalar;
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_i128 deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_u128 deserialize_f32 deserialize_f64 deserialize_char deserialize_str
        deserialize_string deserialize_bytes deserialize_byte_buf deserialize_unit
        deserialize_identifier);
    probe_as!(TypeShape::Option; deserialize_option);
    probe_as!(TypeShape::Sequence; deserialize_seq);
    probe_as!(TypeShape::Map; deserialize_map);

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Signal> {
        Err(Signal::Shape(TypeShape::Scalar))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Signal> {
        Err(Signal::Shape(TypeShape::Newtype { name }))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Signal> {
        Err(Signal::Shape(TypeShape::Sequence))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Signal> {
        Err(Signal::Shape(TypeShape::Sequence))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Signal> {
        Err(Signal::Shape(TypeShape::Struct(StructShape { name, fields })))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Signal> {
        Err(Signal::Shape(TypeShape::Enum { name }))
    }
}
