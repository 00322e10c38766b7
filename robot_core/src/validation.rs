//! # Validation Gate
//!
//! Pure predicate run before anything is sent to the solver. Checks run in a
//! fixed order and stop at the first violation, so the reported reason is
//! always the earliest rule that failed:
//!
//! 1. per-segment arrays are non-empty
//! 2. every angle and length is finite
//! 3. discretization steps are in `1..=10000`
//! 4. tendons (when configured): count in `3..=12`, each radius in `(0, 1]`
//!    meters, coupling offset within ±0.05 m
//!
//! ```rust
//! use robot_core::config::ParameterDefaults;
//! use robot_core::parameters::RobotParameterState;
//! use robot_core::validation::validate;
//!
//! let mut state = RobotParameterState::from_defaults(&ParameterDefaults::default());
//! assert!(validate(&state).is_ok());
//!
//! state.bending_angles.clear();
//! let err = validate(&state).unwrap_err();
//! assert_eq!(err.to_string(), "Bending angles must have at least one value");
//! ```

use crate::errors::{RobotError, RobotResult};
use crate::parameters::RobotParameterState;
use crate::tendon::{MAX_TENDON_COUNT, MIN_TENDON_COUNT};

/// Solver upper bound on discretization steps
pub const MAX_DISCRETIZATION_STEPS: u32 = 10_000;
/// Largest tendon eyelet radius accepted, meters
pub const MAX_TENDON_RADIUS_M: f64 = 1.0;
/// Largest absolute coupling offset accepted, meters
pub const MAX_COUPLING_OFFSET_M: f64 = 0.05;

/// Check a candidate configuration, reporting the first violated rule.
pub fn validate(state: &RobotParameterState) -> RobotResult<()> {
    let segment_arrays = [
        ("bendingAngles", "Bending angles", &state.bending_angles),
        ("rotationAngles", "Rotation angles", &state.rotation_angles),
        ("backboneLengths", "Backbone lengths", &state.backbone_lengths),
    ];

    for (field, label, values) in segment_arrays {
        if values.is_empty() {
            return Err(RobotError::validation(
                field,
                format!("{} must have at least one value", label),
            ));
        }
    }

    let numeric_arrays = segment_arrays
        .into_iter()
        .chain(std::iter::once(("couplingLengths", "Coupling lengths", &state.coupling_lengths)));
    for (field, label, values) in numeric_arrays {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(RobotError::validation(
                format!("{}[{}]", field, index),
                format!("{} must be finite numbers (value {} is {})", label, index + 1, values[index]),
            ));
        }
    }

    if state.discretization_steps == 0 {
        return Err(RobotError::validation(
            "discretizationSteps",
            "Discretization steps must be positive",
        ));
    }
    if state.discretization_steps > MAX_DISCRETIZATION_STEPS {
        return Err(RobotError::validation(
            "discretizationSteps",
            format!("Discretization steps cannot exceed {}", MAX_DISCRETIZATION_STEPS),
        ));
    }

    if let Some(tendons) = &state.tendon_config {
        if !(MIN_TENDON_COUNT..=MAX_TENDON_COUNT).contains(&tendons.count) {
            return Err(RobotError::validation(
                "tendonConfig.count",
                format!(
                    "Tendon count must be between {} and {}",
                    MIN_TENDON_COUNT, MAX_TENDON_COUNT
                ),
            ));
        }
        // written so NaN fails too
        if let Some(index) = tendons
            .radius
            .iter()
            .position(|&r| !(r > 0.0 && r <= MAX_TENDON_RADIUS_M))
        {
            return Err(RobotError::validation(
                format!("tendonConfig.radius[{}]", index),
                format!(
                    "Tendon radius at coupling {} must be greater than 0 and at most {} m",
                    index + 1,
                    MAX_TENDON_RADIUS_M
                ),
            ));
        }
        if !(tendons.coupling_offset.abs() <= MAX_COUPLING_OFFSET_M) {
            return Err(RobotError::validation(
                "tendonConfig.couplingOffset",
                format!("Coupling offset cannot exceed {} m", MAX_COUPLING_OFFSET_M),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterDefaults;
    use crate::errors::ErrorKind;

    fn valid_state() -> RobotParameterState {
        RobotParameterState::from_defaults(&ParameterDefaults::default())
    }

    fn reason(state: &RobotParameterState) -> String {
        validate(state).unwrap_err().to_string()
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&valid_state()).is_ok());
    }

    #[test]
    fn test_empty_bending_angles_rejected() {
        let mut state = valid_state();
        state.bending_angles = vec![];
        let err = validate(&state).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("must have at least one value"));
    }

    #[test]
    fn test_empty_checked_before_finite() {
        let mut state = valid_state();
        state.bending_angles[0] = f64::NAN;
        state.backbone_lengths.clear();
        assert_eq!(reason(&state), "Backbone lengths must have at least one value");
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut state = valid_state();
        state.rotation_angles[1] = f64::INFINITY;
        assert!(reason(&state).starts_with("Rotation angles must be finite"));

        let mut state = valid_state();
        state.coupling_lengths[3] = f64::NEG_INFINITY;
        assert!(reason(&state).starts_with("Coupling lengths must be finite"));

        let mut state = valid_state();
        state.backbone_lengths[0] = f64::NAN;
        assert!(reason(&state).starts_with("Backbone lengths must be finite"));
    }

    #[test]
    fn test_discretization_steps() {
        let mut state = valid_state();
        state.discretization_steps = 0;
        assert_eq!(reason(&state), "Discretization steps must be positive");

        state.discretization_steps = MAX_DISCRETIZATION_STEPS + 1;
        assert!(reason(&state).contains("cannot exceed"));

        state.discretization_steps = MAX_DISCRETIZATION_STEPS;
        assert!(validate(&state).is_ok());
    }

    #[test]
    fn test_tendon_count_bounds() {
        let mut state = valid_state();
        for count in [2, 13] {
            state.tendon_config.as_mut().unwrap().count = count;
            assert_eq!(reason(&state), "Tendon count must be between 3 and 12");
        }
        for count in [3, 12] {
            state.tendon_config.as_mut().unwrap().count = count;
            assert!(validate(&state).is_ok());
        }
    }

    #[test]
    fn test_tendon_radius_bounds() {
        for bad in [0.0, -0.01, 1.5, f64::NAN] {
            let mut state = valid_state();
            state.tendon_config.as_mut().unwrap().radius[2] = bad;
            assert!(reason(&state).starts_with("Tendon radius at coupling 3"));
        }
        let mut state = valid_state();
        state.tendon_config.as_mut().unwrap().radius[0] = 1.0;
        assert!(validate(&state).is_ok());
    }

    #[test]
    fn test_coupling_offset_bound() {
        let mut state = valid_state();
        state.tendon_config.as_mut().unwrap().coupling_offset = -0.06;
        assert!(reason(&state).contains("Coupling offset"));
    }

    #[test]
    fn test_no_tendons_skips_tendon_rules() {
        let mut state = valid_state();
        state.tendon_config = None;
        assert!(validate(&state).is_ok());
    }
}
