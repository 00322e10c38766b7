//! # Session Configuration
//!
//! Timing windows, the storage key and the default values used to fill new
//! array slots. Every field has a default, so a partial TOML table (or none
//! at all) is a valid configuration.
//!
//! ```toml
//! debounce_window_ms = 250
//!
//! [defaults]
//! backbone_length_m = 0.08
//! tendon_radius_m = 0.025
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Key under which the parameter state is persisted
pub const DEFAULT_STORAGE_KEY: &str = "robot_parameters";

/// Timing and persistence settings for one editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Settle window for `request_debounced`
    pub debounce_window_ms: u64,

    /// How long a surfaced error stays visible
    pub error_display_ms: u64,

    /// Pause between publishing the cleared view and committing the preset
    /// baseline. Zero means "yield to the scheduler once".
    pub settle_delay_ms: u64,

    /// Durable storage key for the parameter state
    pub storage_key: String,

    /// Recompute automatically when parameters change
    pub auto_recompute: bool,

    /// Fill values for new array slots and fresh sessions
    pub defaults: ParameterDefaults,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            debounce_window_ms: 200,
            error_display_ms: 5000,
            settle_delay_ms: 0,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            auto_recompute: true,
            defaults: ParameterDefaults::default(),
        }
    }
}

impl SessionConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn error_display_window(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Defaults for a fresh configuration and for padded array slots.
///
/// Angles are in degrees, lengths in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterDefaults {
    pub segments: u32,
    pub bending_angle_deg: f64,
    pub rotation_angle_deg: f64,
    pub backbone_length_m: f64,
    pub coupling_length_m: f64,
    pub discretization_steps: u32,
    pub tendon_count: u32,
    pub tendon_radius_m: f64,
}

impl Default for ParameterDefaults {
    fn default() -> Self {
        ParameterDefaults {
            segments: 3,
            bending_angle_deg: 0.0,
            rotation_angle_deg: 0.0,
            backbone_length_m: 0.07,
            coupling_length_m: 0.03,
            discretization_steps: 1000,
            tendon_count: 3,
            tendon_radius_m: 0.03,
        }
    }
}
