//! Optional configuration sections.
//!
//! `Option<T>` cannot tell "the source did not mention this section" apart
//! from "the section falls back to a default the source may partially
//! override". [`Optional`] keeps the three cases separate:
//!
//! - `None`: no section. Also what an explicit `null` (or `enabled: false`
//!   when the gate is on) decodes to.
//! - `Some(v)`: a section that was built explicitly or found in the source.
//! - `Default(v)`: a caller-supplied section used when the source is silent.
//!   Decoding a subtree onto it overrides only the keys the subtree names and
//!   turns it into `Some`.
//!
//! The element must be a struct (checked at decode time, see
//! [`crate::shape`]) and must not declare a field named
//! [`ENABLED_FIELD`](crate::ENABLED_FIELD), which is reserved for the
//! feature-gated enable switch.

use serde::de::{self, DeserializeOwned, DeserializeSeed, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::constants::{ENABLED_FIELD, ENABLED_FIELD_GATE};
use crate::decode::{self, Decoder, Unmarshal};
use crate::error::Error;
use crate::shape::StructShape;
use crate::validate::{Validate, ValidationError};

/// Which of the three states an [`Optional`] is in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Flavor {
    None,
    Some,
    Default,
}

/// A struct-typed configuration section that is absent, explicitly set, or
/// backed by a default the source may partially override.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Optional<T> {
    /// No section.
    None,
    /// Built explicitly or found in the source.
    Some(T),
    /// Supplied by surrounding code; used when the source says nothing.
    Default(T),
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Optional::None
    }
}

impl<T> From<Option<T>> for Optional<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Optional::Some(v),
            None => Optional::None,
        }
    }
}

impl<T> Optional<T> {
    /// An absent section; same as `Optional::default()`.
    pub fn none() -> Self {
        Optional::None
    }

    /// An explicitly set section.
    pub fn some(value: T) -> Self {
        Optional::Some(value)
    }

    /// A section that applies unless the configuration source says otherwise.
    pub fn with_default(value: T) -> Self {
        Optional::Default(value)
    }

    /// Which of the three states this is in.
    #[inline]
    pub fn flavor(&self) -> Flavor {
        match self {
            Optional::None => Flavor::None,
            Optional::Some(_) => Flavor::Some,
            Optional::Default(_) => Flavor::Default,
        }
    }

    /// True for both `Some` and `Default`.
    #[inline]
    pub fn has_value(&self) -> bool {
        !self.is_none()
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Optional::None)
    }

    /// Only an explicitly set section; a pending default does not count.
    pub fn is_some(&self) -> bool {
        matches!(self, Optional::Some(_))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Optional::Default(_))
    }

    /// The element for `Some` and `Default`.
    pub fn get(&self) -> Option<&T> {
        match self {
            Optional::None => None,
            Optional::Some(v) | Optional::Default(v) => Some(v),
        }
    }

    /// Mutable access without changing the flavor. Edits to a `Default`
    /// element stay a default.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Optional::None => None,
            Optional::Some(v) | Optional::Default(v) => Some(v),
        }
    }

    pub fn as_option(&self) -> Option<&T> {
        self.get()
    }

    /// Drops the distinction between `Some` and `Default`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Optional::None => None,
            Optional::Some(v) | Optional::Default(v) => Some(v),
        }
    }

    /// Guarantee an element and mark it as set: `None` becomes
    /// `Some(T::default())`, `Default(v)` becomes `Some(v)`.
    pub fn get_or_insert_default(&mut self) -> &mut T
    where
        T: Default,
    {
        match self {
            Optional::Some(v) => v,
            Optional::None => {
                *self = Optional::Some(T::default());
                self.get_or_insert_default()
            }
            Optional::Default(v) => {
                let value = std::mem::take(v);
                *self = Optional::Some(value);
                self.get_or_insert_default()
            }
        }
    }
}

impl<T> Unmarshal for Optional<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn unmarshal(&mut self, mut tree: JsonValue, decoder: &Decoder<'_>) -> Result<(), Error> {
        let shape = StructShape::of::<T>()?;
        if shape.has_field(ENABLED_FIELD) {
            return Err(Error::unsupported::<T>(format!(
                "field '{ENABLED_FIELD}' is reserved for optional sections"
            )));
        }

        if tree.is_null() {
            log::debug!(
                "{}: null subtree, {:?} -> None",
                shape.name,
                self.flavor()
            );
            *self = Optional::None;
            return Ok(());
        }

        if decoder.gates().is_enabled(ENABLED_FIELD_GATE) {
            if let JsonValue::Object(map) = &mut tree {
                match map.remove(ENABLED_FIELD) {
                    Some(JsonValue::Bool(false)) => {
                        log::debug!(
                            "{}: disabled, {:?} -> None",
                            shape.name,
                            self.flavor()
                        );
                        *self = Optional::None;
                        return Ok(());
                    }
                    Some(JsonValue::Bool(true)) | None => {}
                    Some(other) => {
                        return Err(Error::InvalidDiscriminator {
                            found: other.to_string(),
                        });
                    }
                }
            }
        }

        if !self.is_some() {
            log::debug!("{}: {:?} -> Some", shape.name, self.flavor());
        }
        let target = self.get_or_insert_default();
        decoder.decode_shaped(tree, target, &shape)
    }
}

/// In-place decode, honouring the container's current flavor. Inside
/// [`Decoder::decode_into`] the enclosing decoder is used, so nested sections
/// see its gates and key policy; at top level this is [`Decoder::global`].
/// Call [`Unmarshal::unmarshal`] to pick a decoder explicitly.
impl<'de, T> DeserializeSeed<'de> for &mut Optional<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        let tree = Option::<JsonValue>::deserialize(deserializer)?.unwrap_or(JsonValue::Null);
        decode::with_active(|decoder| self.unmarshal(tree, decoder)).map_err(de::Error::custom)
    }
}

// A missing key inside a derived parent reaches us through
// `deserialize_option` and lands as `None`.
impl<'de, T> Deserialize<'de> for Optional<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Optional<T>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut place = Optional::None;
        DeserializeSeed::deserialize(&mut place, deserializer)?;
        Ok(place)
    }
}

// Serialize as the bare element (or null) so parents can be merged by
// `Decoder::decode_into` with defaults riding along in the tree.
impl<T: Serialize> Serialize for Optional<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Optional::None => serializer.serialize_none(),
            Optional::Some(v) | Optional::Default(v) => serializer.serialize_some(v),
        }
    }
}

/// Only an explicitly set section is validated; defaults are trusted and an
/// absent section has nothing to check.
impl<T: Validate> Validate for Optional<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Optional::Some(v) => v.validate(),
            Optional::None | Optional::Default(_) => Ok(()),
        }
    }
}
