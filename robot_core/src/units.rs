//! # Unit Types
//!
//! Lightweight newtype wrappers for the units that cross the solver boundary.
//!
//! The editable configuration keeps angles in degrees (what the user types)
//! and every length in meters. [`crate::solver::SolverRequest`] carries
//! [`Radians`] and [`Meters`], so the unit each field is in shows in its type.
//!
//! ## Example
//!
//! ```rust
//! use robot_core::units::{degrees_to_radians, Degrees, Meters, Radians};
//!
//! let bend = Degrees(90.0);
//! let rad: Radians = bend.into();
//! assert!((rad.0 - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
//!
//! assert_eq!(degrees_to_radians(&[0.0]), vec![Radians(0.0)]);
//! assert_eq!(Meters::all(&[0.07, 0.03]), vec![Meters(0.07), Meters(0.03)]);
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// Angle Units
// ============================================================================

/// Angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Degrees(pub f64);

/// Angle in radians
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Radians(pub f64);

impl From<Degrees> for Radians {
    fn from(deg: Degrees) -> Self {
        Radians(deg.0.to_radians())
    }
}

impl From<Radians> for Degrees {
    fn from(rad: Radians) -> Self {
        Degrees(rad.0.to_degrees())
    }
}

// ============================================================================
// Length Units
// ============================================================================

/// Length in meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

impl Meters {
    /// Tag a slice of raw meter values.
    pub fn all(values: &[f64]) -> Vec<Meters> {
        values.iter().copied().map(Meters).collect()
    }
}

/// Convert a slice of degree values to radians.
pub fn degrees_to_radians(values: &[f64]) -> Vec<Radians> {
    values.iter().map(|&d| Radians::from(Degrees(d))).collect()
}
