//! Process-wide feature gates.
//!
//! Gates are registered once with a [`Stage`] that fixes their default and
//! whether they may be toggled. The decoder consults [`global()`] unless it is
//! handed a dedicated [`Registry`].

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::constants::{ENABLED_FIELD_GATE, ENABLED_FIELD_GATE_DESCRIPTION};
use crate::error::Error;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::with_builtin_gates);

/// The registry consulted by [`crate::Decoder::global`].
pub fn global() -> &'static Registry {
    &GLOBAL
}

/// Maturity of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Off by default, may be enabled.
    Alpha,
    /// On by default, may be disabled.
    Beta,
    /// Always on.
    Stable,
    /// Always off.
    Deprecated,
}

impl Stage {
    fn default_enabled(self) -> bool {
        matches!(self, Stage::Beta | Stage::Stable)
    }

    fn allows(self, enabled: bool) -> bool {
        match self {
            Stage::Alpha | Stage::Beta => true,
            Stage::Stable => enabled,
            Stage::Deprecated => !enabled,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Alpha => "alpha",
            Stage::Beta => "beta",
            Stage::Stable => "stable",
            Stage::Deprecated => "deprecated",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    id: String,
    stage: Stage,
    description: String,
    enabled: bool,
}

impl Gate {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    gates: RwLock<HashMap<String, Gate>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every gate this crate defines, at its stage default.
    pub fn with_builtin_gates() -> Self {
        let registry = Self::new();
        registry.insert(Gate {
            id: ENABLED_FIELD_GATE.to_string(),
            stage: Stage::Alpha,
            description: ENABLED_FIELD_GATE_DESCRIPTION.to_string(),
            enabled: Stage::Alpha.default_enabled(),
        });
        registry
    }

    pub fn register(
        &self,
        id: impl Into<String>,
        stage: Stage,
        description: impl Into<String>,
    ) -> Result<(), Error> {
        let id = id.into();
        if !valid_id(&id) {
            return Err(Error::InvalidGateId(id));
        }
        let mut gates = self.write();
        if gates.contains_key(&id) {
            return Err(Error::DuplicateGate(id));
        }
        log::debug!("registering feature gate '{id}' ({stage})");
        gates.insert(
            id.clone(),
            Gate {
                id,
                stage,
                description: description.into(),
                enabled: stage.default_enabled(),
            },
        );
        Ok(())
    }

    /// Unknown gates report `false`.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.read().get(id).is_some_and(|gate| gate.enabled)
    }

    pub fn set(&self, id: &str, enabled: bool) -> Result<(), Error> {
        let mut gates = self.write();
        let gate = gates
            .get_mut(id)
            .ok_or_else(|| Error::UnknownGate(id.to_string()))?;
        if !gate.stage.allows(enabled) {
            return Err(Error::GateLocked {
                id: id.to_string(),
                stage: gate.stage,
            });
        }
        if gate.enabled != enabled {
            log::debug!("feature gate '{id}' set to {enabled}");
        }
        gate.enabled = enabled;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Gate> {
        self.read().get(id).cloned()
    }

    /// Snapshot of all gates, sorted by id.
    pub fn gates(&self) -> Vec<Gate> {
        let mut gates: Vec<Gate> = self.read().values().cloned().collect();
        gates.sort_by(|a, b| a.id.cmp(&b.id));
        gates
    }

    /// Independent copy of the current gate states.
    pub(crate) fn snapshot(&self) -> Registry {
        Registry {
            gates: RwLock::new(self.read().clone()),
        }
    }

    fn insert(&self, gate: Gate) {
        self.write().insert(gate.id.clone(), gate);
    }

    // A panic while holding the lock cannot leave a gate half-written.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Gate>> {
        self.gates.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Gate>> {
        self.gates.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
