//! # Presets
//!
//! Named, saved configurations served by the preset collaborator. The stored
//! `configuration` is free-form JSON on the service side; it is parsed into a
//! typed [`ParameterPayload`] on load, with missing fields filled from
//! defaults and legacy scalar tendon radii broadcast per coupling.
//!
//! ## Preset JSON
//!
//! ```json
//! {
//!   "id": 7,
//!   "name": "Three segment S-curve",
//!   "description": null,
//!   "is_public": true,
//!   "configuration": {
//!     "segments": 3,
//!     "bendingAngles": [20.5, -36, 36],
//!     "tendonConfig": { "count": 3, "radius": 0.03 }
//!   },
//!   "created_at": "2025-01-01T00:00:00Z"
//! }
//! ```

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ParameterDefaults;
use crate::errors::{RobotError, RobotResult};
use crate::parameters::{ParameterPayload, RobotParameterState};

/// A saved configuration as returned by the preset service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    /// Service-side index column, informational only
    #[serde(default)]
    pub segments: Option<u32>,
    /// Service-side index column, informational only
    #[serde(default)]
    pub tendon_count: Option<u32>,
    pub configuration: serde_json::Value,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Preset {
    /// Parse the configuration payload.
    pub fn configuration(&self) -> RobotResult<ParameterPayload> {
        serde_json::from_value(self.configuration.clone())
            .map_err(|e| RobotError::malformed_preset(&self.name, e.to_string()))
    }

    /// Parse and normalize into a complete parameter state.
    pub fn to_state(&self, defaults: &ParameterDefaults) -> RobotResult<RobotParameterState> {
        Ok(self.configuration()?.into_state(defaults))
    }
}

/// The service stores timestamps without an offset; those are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw))),
            None => Ok(None),
        }
    }
}

/// Body for creating a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetDraft {
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub configuration: serde_json::Value,
}

impl PresetDraft {
    /// Snapshot the given parameters as a new private preset.
    pub fn from_state(name: impl Into<String>, state: &RobotParameterState) -> RobotResult<Self> {
        Ok(PresetDraft {
            name: name.into(),
            description: None,
            is_public: false,
            configuration: serde_json::to_value(state)?,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }
}

/// Body for updating a preset; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,
}

/// The preset collaborator.
///
/// Authentication is the implementor's concern; this interface is injected
/// wherever presets are needed rather than reached through a global session.
pub trait PresetSource {
    fn list_public_presets(&self) -> impl Future<Output = RobotResult<Vec<Preset>>>;

    /// Presets owned by the signed-in user
    fn get_user_presets(&self) -> impl Future<Output = RobotResult<Vec<Preset>>>;

    fn get_preset(&self, id: i64) -> impl Future<Output = RobotResult<Preset>>;

    fn create_preset(&self, draft: PresetDraft) -> impl Future<Output = RobotResult<Preset>>;

    fn update_preset(&self, id: i64, patch: PresetPatch) -> impl Future<Output = RobotResult<Preset>>;

    fn delete_preset(&self, id: i64) -> impl Future<Output = RobotResult<()>>;
}

/// The preset used to bootstrap an empty session: one named "Default"
/// (case-insensitive) if there is one, otherwise the first listed.
pub fn pick_default(presets: &[Preset]) -> Option<&Preset> {
    presets
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case("default"))
        .or_else(|| presets.first())
}
