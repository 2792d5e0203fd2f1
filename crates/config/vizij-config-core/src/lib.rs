//! vizij-config-core: optional configuration values (core, format-agnostic)
//!
//! [`Optional`] is a three-state container for struct-typed configuration
//! sections: absent, present, or backed by a caller-supplied default that the
//! configuration source may partially override. Decoding goes through serde and
//! an untyped [`serde_json::Value`] tree; validation goes through [`Validate`].

pub mod constants;
pub mod decode;
pub mod error;
pub mod featuregate;
pub mod optional;
pub mod shape;
pub mod validate;

pub use constants::{ENABLED_FIELD, ENABLED_FIELD_GATE};
pub use decode::{merge, Decoder, DecoderConfig, Unmarshal};
pub use error::Error;
pub use optional::{Flavor, Optional};
pub use shape::{StructShape, TypeShape};
pub use validate::{validate_fields, Validate, ValidationError, ValidationErrors};
