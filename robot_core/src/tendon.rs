//! # Tendon Configuration
//!
//! Tendons are routed through eyelets on every coupling, so the routing
//! radius is stored per coupling and must always have `segments + 1` entries.
//!
//! Older presets and stored sessions carry a single scalar radius. Those are
//! accepted through [`RadiusInput`] and broadcast by [`normalize_radius`], so
//! nothing downstream ever sees the scalar form.
//!
//! ## JSON
//!
//! ```json
//! { "count": 3, "radius": [0.03, 0.03, 0.03, 0.03], "couplingOffset": 0.0 }
//! { "count": 3, "radius": 0.03 }
//! ```

use serde::{Deserialize, Serialize};

use crate::arrays::resize;

/// Minimum tendon count the solver accepts
pub const MIN_TENDON_COUNT: u32 = 3;
/// Maximum tendon count the solver accepts
pub const MAX_TENDON_COUNT: u32 = 12;

/// Normalized tendon configuration held in the parameter state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TendonConfig {
    /// Number of tendons, 3..=12
    pub count: u32,

    /// Eyelet radius per coupling in meters, one entry per coupling
    pub radius: Vec<f64>,

    /// Vertical eyelet offset in meters
    #[serde(default)]
    pub coupling_offset: f64,
}

impl TendonConfig {
    /// Tendon config with every coupling at the same radius.
    pub fn uniform(count: u32, radius: f64, coupling_count: usize) -> Self {
        TendonConfig {
            count,
            radius: vec![radius; coupling_count],
            coupling_offset: 0.0,
        }
    }
}

/// Radius as it may arrive from a preset or an older stored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RadiusInput {
    /// Legacy single radius for all couplings
    Scalar(f64),
    /// One radius per coupling
    PerCoupling(Vec<f64>),
}

/// Tendon block of an incoming payload, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TendonConfigInput {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub radius: Option<RadiusInput>,
    #[serde(default)]
    pub coupling_offset: Option<f64>,
}

impl TendonConfigInput {
    /// Fill missing fields and bring the radius to `coupling_count` entries.
    pub fn normalize(&self, coupling_count: usize, default_count: u32, default_radius: f64) -> TendonConfig {
        TendonConfig {
            count: self.count.unwrap_or(default_count),
            radius: normalize_radius(self.radius.as_ref(), coupling_count, default_radius),
            coupling_offset: self.coupling_offset.unwrap_or(0.0),
        }
    }
}

impl From<&TendonConfig> for TendonConfigInput {
    fn from(config: &TendonConfig) -> Self {
        TendonConfigInput {
            count: Some(config.count),
            radius: Some(RadiusInput::PerCoupling(config.radius.clone())),
            coupling_offset: Some(config.coupling_offset),
        }
    }
}

/// Produce a per-coupling radius array of exactly `coupling_count` entries.
///
/// - array input is resized, padding with `default`
/// - scalar input is broadcast to every coupling
/// - missing input becomes `coupling_count` copies of `default`
pub fn normalize_radius(radius: Option<&RadiusInput>, coupling_count: usize, default: f64) -> Vec<f64> {
    match radius {
        Some(RadiusInput::PerCoupling(values)) => resize(values, coupling_count, default),
        Some(RadiusInput::Scalar(r)) => vec![*r; coupling_count],
        None => vec![default; coupling_count],
    }
}
