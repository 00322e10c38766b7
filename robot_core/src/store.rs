//! # Parameter Store
//!
//! Owns the canonical [`RobotParameterState`]. Every mutation goes through
//! [`ParameterStore::set`], which merges, clamps, resizes the dependent arrays
//! and then persists the result. Nothing here ever rejects input; the
//! validation gate does that at submission time.
//!
//! ## Example
//!
//! ```rust
//! use robot_core::config::SessionConfig;
//! use robot_core::parameters::ParameterUpdate;
//! use robot_core::storage::MemoryStorage;
//! use robot_core::store::ParameterStore;
//!
//! let mut store = ParameterStore::open(Box::new(MemoryStorage::new()), &SessionConfig::default());
//! store.set(ParameterUpdate::new().segments(5));
//! assert_eq!(store.get().bending_angles.len(), 5);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::config::{ParameterDefaults, SessionConfig};
use crate::parameters::{ParameterPayload, ParameterUpdate, RobotParameterState};
use crate::storage::Storage;

/// Store handle shared between the pipeline, the preset transaction and the UI.
pub type SharedStore = Rc<RefCell<ParameterStore>>;

/// Holder of the editable configuration.
pub struct ParameterStore {
    state: RobotParameterState,
    defaults: ParameterDefaults,
    storage: Box<dyn Storage>,
    storage_key: String,
    revision: u64,
}

impl ParameterStore {
    /// Open a store, restoring the last persisted state when there is one.
    ///
    /// Missing, unreadable or corrupt stored data falls back to defaults.
    pub fn open(storage: Box<dyn Storage>, config: &SessionConfig) -> Self {
        let state = restore(storage.as_ref(), &config.storage_key, &config.defaults);
        ParameterStore {
            state,
            defaults: config.defaults.clone(),
            storage,
            storage_key: config.storage_key.clone(),
            revision: 0,
        }
    }

    /// Open a store and wrap it for sharing.
    pub fn shared(storage: Box<dyn Storage>, config: &SessionConfig) -> SharedStore {
        Rc::new(RefCell::new(ParameterStore::open(storage, config)))
    }

    /// Current configuration
    pub fn get(&self) -> &RobotParameterState {
        &self.state
    }

    /// Owned copy of the current configuration
    pub fn snapshot(&self) -> RobotParameterState {
        self.state.clone()
    }

    pub fn defaults(&self) -> &ParameterDefaults {
        &self.defaults
    }

    /// Number of mutations applied since the store was opened
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a partial update and persist.
    pub fn set(&mut self, update: ParameterUpdate) -> &RobotParameterState {
        let next = self.state.apply(update, &self.defaults);
        if next.segments != self.state.segments {
            log::debug!("Segments {} -> {}", self.state.segments, next.segments);
        }
        self.state = next;
        self.revision += 1;
        self.persist();
        &self.state
    }

    /// Apply an update computed from the current state.
    pub fn update_with<F>(&mut self, f: F) -> &RobotParameterState
    where
        F: FnOnce(&RobotParameterState) -> ParameterUpdate,
    {
        let update = f(&self.state);
        self.set(update)
    }

    /// Set one element of a per-segment or per-coupling array.
    ///
    /// Returns `false` (and changes nothing) when `index` is out of range.
    pub fn set_value(&mut self, field: ParameterField, index: usize, value: f64) -> bool {
        match field.update_for(&self.state, index, value) {
            Some(update) => {
                self.set(update);
                true
            }
            None => {
                log::warn!("Ignoring {} edit at index {}: out of range", field, index);
                false
            }
        }
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.state) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Could not serialize parameters: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.storage_key, &json) {
            log::warn!("Could not persist parameters: {}", e);
        }
    }
}

fn restore(storage: &dyn Storage, key: &str, defaults: &ParameterDefaults) -> RobotParameterState {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return RobotParameterState::from_defaults(defaults),
        Err(e) => {
            log::warn!("Could not read stored parameters, using defaults: {}", e);
            return RobotParameterState::from_defaults(defaults);
        }
    };
    match serde_json::from_str::<ParameterPayload>(&raw) {
        Ok(payload) => payload.into_state(defaults),
        Err(e) => {
            log::warn!("Stored parameters are corrupt, using defaults: {}", e);
            RobotParameterState::from_defaults(defaults)
        }
    }
}

/// One addressable array in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterField {
    BendingAngle,
    RotationAngle,
    BackboneLength,
    CouplingLength,
    TendonRadius,
}

impl ParameterField {
    /// Build the update that sets `index` of this field to `value`.
    pub fn update_for(self, state: &RobotParameterState, index: usize, value: f64) -> Option<ParameterUpdate> {
        fn replaced(values: &[f64], index: usize, value: f64) -> Option<Vec<f64>> {
            let mut values = values.to_vec();
            *values.get_mut(index)? = value;
            Some(values)
        }

        let update = ParameterUpdate::new();
        match self {
            ParameterField::BendingAngle => {
                Some(update.bending_angles(replaced(&state.bending_angles, index, value)?))
            }
            ParameterField::RotationAngle => {
                Some(update.rotation_angles(replaced(&state.rotation_angles, index, value)?))
            }
            ParameterField::BackboneLength => {
                Some(update.backbone_lengths(replaced(&state.backbone_lengths, index, value)?))
            }
            ParameterField::CouplingLength => {
                Some(update.coupling_lengths(replaced(&state.coupling_lengths, index, value)?))
            }
            ParameterField::TendonRadius => {
                let mut tendons = state.tendon_config.clone()?;
                tendons.radius = replaced(&tendons.radius, index, value)?;
                Some(update.tendon_config(tendons))
            }
        }
    }
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterField::BendingAngle => "bendingAngles",
            ParameterField::RotationAngle => "rotationAngles",
            ParameterField::BackboneLength => "backboneLengths",
            ParameterField::CouplingLength => "couplingLengths",
            ParameterField::TendonRadius => "tendonConfig.radius",
        };
        f.write_str(name)
    }
}

impl FromStr for ParameterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bend" | "bendingAngles" => Ok(ParameterField::BendingAngle),
            "rotate" | "rotationAngles" => Ok(ParameterField::RotationAngle),
            "backbone" | "backboneLengths" => Ok(ParameterField::BackboneLength),
            "coupling" | "couplingLengths" => Ok(ParameterField::CouplingLength),
            "radius" | "tendonConfig.radius" => Ok(ParameterField::TendonRadius),
            other => Err(format!("Unknown parameter field: {}", other)),
        }
    }
}
