//! Struct decoding from untyped JSON trees.
//!
//! [`Decoder::decode_into`] overlays a tree onto an existing struct instead of
//! building a fresh one: the target is serialized, the tree is deep-merged over
//! it with [`merge`], and the result is deserialized back. Keys the tree does
//! not mention keep whatever the target already held. That only works when the
//! target's `Serialize` writes every field its `Deserialize` reads; a field the
//! serializer drops (`#[serde(skip_serializing)]`) and the tree does not name is
//! reported as [`Error::UnsupportedElementKind`] instead of being lost.
//!
//! While a decode runs, its decoder is the thread's active decoder. Nested
//! [`Optional`](crate::Optional) fields that serde reaches pick it up through
//! `with_active`, so they see the caller's gates and key policy.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Error;
use crate::featuregate::{self, Registry};
use crate::shape::{SerializedFields, StructShape};

thread_local! {
    // Innermost decode last.
    static ACTIVE: RefCell<Vec<Rc<ActiveDecoder>>> = RefCell::new(Vec::new());
}

/// Decoder policy knobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Reject keys that the target struct does not declare. Only the top level
    /// of each decoded struct is checked; `Optional` sections nested in it are
    /// decoded with the same policy.
    pub deny_unknown_keys: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            deny_unknown_keys: false,
        }
    }
}

/// Decode capability handed to [`Unmarshal`] implementations.
#[derive(Clone, Debug)]
pub struct Decoder<'g> {
    config: DecoderConfig,
    gates: &'g Registry,
}

impl<'g> Decoder<'g> {
    pub fn new(config: DecoderConfig, gates: &'g Registry) -> Self {
        Self { config, gates }
    }

    /// Default policy with the process-wide gate registry. Used by the serde
    /// entry points when no decode is in progress on the thread.
    pub fn global() -> Decoder<'static> {
        Decoder::new(DecoderConfig::default(), featuregate::global())
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn gates(&self) -> &'g Registry {
        self.gates
    }

    /// Overlay `tree` onto `target`.
    pub fn decode_into<T>(&self, tree: JsonValue, target: &mut T) -> Result<(), Error>
    where
        T: Serialize + DeserializeOwned,
    {
        let shape = StructShape::of::<T>()?;
        self.decode_shaped(tree, target, &shape)
    }

    /// Decode `tree` on top of `T::default()`.
    pub fn decode<T>(&self, tree: JsonValue) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let mut target = T::default();
        self.decode_into(tree, &mut target)?;
        Ok(target)
    }

    pub(crate) fn decode_shaped<T>(
        &self,
        tree: JsonValue,
        target: &mut T,
        shape: &StructShape,
    ) -> Result<(), Error>
    where
        T: Serialize + DeserializeOwned,
    {
        if self.config.deny_unknown_keys {
            if let JsonValue::Object(map) = &tree {
                if let Some(key) = map.keys().find(|key| !shape.has_field(key)) {
                    return Err(Error::UnknownKey {
                        type_name: std::any::type_name::<T>(),
                        key: key.clone(),
                    });
                }
            }
        }
        let serialized = SerializedFields::of(&*target)?;
        let named =
            |field: &str| matches!(&tree, JsonValue::Object(map) if map.contains_key(field));
        if let Some(lost) = shape
            .fields
            .iter()
            .find(|&&field| !serialized.covers(field) && !named(field))
        {
            return Err(Error::unsupported::<T>(format!(
                "field '{lost}' is not serialized, so its current value cannot survive a partial decode"
            )));
        }

        log::trace!("decoding into {}", shape.name);
        let mut merged = serde_json::to_value(&*target)?;
        merge(&mut merged, tree);
        *target = {
            let _scope = ActiveScope::enter(self);
            serde_json::from_value(merged)?
        };
        Ok(())
    }
}

struct ActiveDecoder {
    config: DecoderConfig,
    gates: Registry,
}

struct ActiveScope;

impl ActiveScope {
    fn enter(decoder: &Decoder<'_>) -> Self {
        let active = Rc::new(ActiveDecoder {
            config: decoder.config.clone(),
            gates: decoder.gates.snapshot(),
        });
        ACTIVE.with(|stack| stack.borrow_mut().push(active));
        ActiveScope
    }
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run `f` with the decoder of the innermost decode in progress on this
/// thread, or [`Decoder::global`] when there is none.
pub(crate) fn with_active<R>(f: impl FnOnce(&Decoder<'_>) -> R) -> R {
    let active = ACTIVE.with(|stack| stack.borrow().last().cloned());
    match active {
        Some(active) => f(&Decoder::new(active.config.clone(), &active.gates)),
        None => f(&Decoder::global()),
    }
}

/// Custom decode hook: a type that wants to control how its subtree is applied
/// (rather than being rebuilt by serde) implements this.
pub trait Unmarshal {
    fn unmarshal(&mut self, tree: JsonValue, decoder: &Decoder<'_>) -> Result<(), Error>;
}

/// Deep-merge `overlay` into `base`. Objects merge key by key; any other value,
/// including `null`, replaces what was there.
pub fn merge(base: &mut JsonValue, overlay: JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
