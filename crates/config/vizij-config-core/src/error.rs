use thiserror::Error;

use crate::featuregate::Stage;
use crate::validate::ValidationError;

/// Errors produced while decoding, validating or gating configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// The element type cannot back an optional section: it is not a struct,
    /// or it declares a field under the reserved discriminator name.
    #[error("unsupported element kind for {type_name}: {reason}")]
    UnsupportedElementKind {
        type_name: &'static str,
        reason: String,
    },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("'enabled' must be a boolean, got {found}")]
    InvalidDiscriminator { found: String },
    #[error("unknown key '{key}' for {type_name}")]
    UnknownKey {
        type_name: &'static str,
        key: String,
    },
    #[error("unknown feature gate '{0}'")]
    UnknownGate(String),
    #[error("feature gate '{0}' is already registered")]
    DuplicateGate(String),
    #[error("invalid feature gate id '{0}'")]
    InvalidGateId(String),
    #[error("feature gate '{id}' is {stage} and cannot be changed")]
    GateLocked { id: String, stage: Stage },
}

impl Error {
    pub(crate) fn unsupported<T: ?Sized>(reason: impl Into<String>) -> Self {
        Error::UnsupportedElementKind {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// True for contract violations on the element type rather than bad data.
    pub fn is_unsupported_element(&self) -> bool {
        matches!(self, Error::UnsupportedElementKind { .. })
    }
}
