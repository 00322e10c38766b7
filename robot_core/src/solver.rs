//! # Solver Interface
//!
//! The kinematics solver is an opaque collaborator: it receives the robot
//! parameters in solver units and returns one sequence of 3D points per
//! segment, plus tendon actuation data when tendons are configured.
//!
//! ## Request JSON
//!
//! ```json
//! {
//!   "bending_angles": [0.357, 0.628],
//!   "rotation_angles": [1.047, 1.047],
//!   "backbone_lengths": [0.07, 0.07],
//!   "coupling_lengths": [0.03, 0.03, 0.015],
//!   "discretization_steps": 1000,
//!   "tendon_config": { "count": 3, "radius": [0.03, 0.03, 0.03], "coupling_offset": 0.0 }
//! }
//! ```

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::errors::SolverError;
use crate::parameters::RobotParameterState;
use crate::units::{degrees_to_radians, Meters, Radians};

/// A point in robot base coordinates, meters
pub type Point3 = [f64; 3];

/// Parameters in solver units: radians and meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverRequest {
    pub bending_angles: Vec<Radians>,
    pub rotation_angles: Vec<Radians>,
    pub backbone_lengths: Vec<Meters>,
    pub coupling_lengths: Vec<Meters>,
    pub discretization_steps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tendon_config: Option<SolverTendonConfig>,
}

/// Tendon block of a solver request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverTendonConfig {
    pub count: u32,
    pub radius: Vec<Meters>,
    pub coupling_offset: Meters,
}

impl SolverRequest {
    /// Map the editable state into solver units.
    pub fn from_state(state: &RobotParameterState) -> Self {
        SolverRequest {
            bending_angles: degrees_to_radians(&state.bending_angles),
            rotation_angles: degrees_to_radians(&state.rotation_angles),
            backbone_lengths: Meters::all(&state.backbone_lengths),
            coupling_lengths: Meters::all(&state.coupling_lengths),
            discretization_steps: state.discretization_steps,
            tendon_config: state.tendon_config.as_ref().map(|t| SolverTendonConfig {
                count: t.count,
                radius: Meters::all(&t.radius),
                coupling_offset: Meters(t.coupling_offset),
            }),
        }
    }

    pub fn has_tendons(&self) -> bool {
        self.tendon_config.is_some()
    }
}

/// Computed robot shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolverResponse {
    /// Backbone points, one sequence per segment
    pub segments: Vec<Vec<Point3>>,

    /// Tendon routing and actuation, when tendons were configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tendons: Option<TendonAnalysis>,
}

impl SolverResponse {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    /// Last point of the last segment
    pub fn tip(&self) -> Option<Point3> {
        self.segments.iter().rev().find_map(|s| s.last().copied())
    }
}

/// Tendon output of the solver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TendonAnalysis {
    /// Commands keyed by 1-based tendon name ("1", "2", ...)
    #[serde(default)]
    pub actuation_commands: BTreeMap<String, ActuationCommand>,

    /// Eyelet positions, per coupling then per tendon
    #[serde(default)]
    pub routing_points: Vec<Vec<Point3>>,

    /// Total routed length per tendon, meters
    #[serde(default)]
    pub total_lengths: Vec<f64>,
}

/// What to do with one tendon to reach the computed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuationCommand {
    pub length_change_m: f64,
    pub pull_direction: PullDirection,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullDirection {
    Pull,
    Release,
    Hold,
}

impl PullDirection {
    /// Shortened tendons are pulled, lengthened ones released.
    pub fn from_length_change(change_m: f64) -> Self {
        if change_m > 0.0 {
            PullDirection::Release
        } else if change_m < 0.0 {
            PullDirection::Pull
        } else {
            PullDirection::Hold
        }
    }
}

/// The external kinematics solver.
///
/// Transport and retries are the implementor's business; failures must be
/// reported with the [`SolverError`] variant matching their shape so the
/// pipeline can classify them.
pub trait Solver {
    fn solve(&self, request: SolverRequest) -> impl Future<Output = Result<SolverResponse, SolverError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterDefaults;

    #[test]
    fn test_request_converts_angles_only() {
        let mut state = RobotParameterState::from_defaults(&ParameterDefaults::default());
        state.bending_angles = vec![90.0, 0.0, 180.0];
        let request = SolverRequest::from_state(&state);

        assert!((request.bending_angles[0].0 - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((request.bending_angles[2].0 - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(request.backbone_lengths, Meters::all(&state.backbone_lengths));
        assert_eq!(request.coupling_lengths, Meters::all(&state.coupling_lengths));
        assert!(request.has_tendons());
    }

    #[test]
    fn test_request_wire_format() {
        let mut state = RobotParameterState::from_defaults(&ParameterDefaults::default());
        state.tendon_config = None;
        let json = serde_json::to_value(SolverRequest::from_state(&state)).unwrap();
        assert!(json.get("bending_angles").is_some());
        assert!(json.get("discretization_steps").is_some());
        assert!(json.get("tendon_config").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "segments": [[[0,0,0],[0,0,0.03]], [[0,0,0.03],[0.01,0,0.1]]],
            "tendons": {
                "actuation_commands": {
                    "1": {"length_change_m": -0.002, "pull_direction": "pull", "magnitude": 0.002}
                }
            }
        }"#;
        let response: SolverResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.segment_count(), 2);
        assert_eq!(response.point_count(), 4);
        assert_eq!(response.tip(), Some([0.01, 0.0, 0.1]));

        let tendons = response.tendons.unwrap();
        assert_eq!(tendons.actuation_commands["1"].pull_direction, PullDirection::Pull);
        assert!(tendons.routing_points.is_empty());
    }

    #[test]
    fn test_pull_direction() {
        assert_eq!(PullDirection::from_length_change(-0.01), PullDirection::Pull);
        assert_eq!(PullDirection::from_length_change(0.01), PullDirection::Release);
        assert_eq!(PullDirection::from_length_change(0.0), PullDirection::Hold);
    }
}
