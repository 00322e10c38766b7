//! # Robot Parameter State
//!
//! The editable configuration of a multi-segment soft robot, the partial
//! update type used to mutate it, and the lenient payload type used for
//! presets and stored sessions.
//!
//! ## Structure
//!
//! ```text
//! RobotParameterState
//! ├── segments: 1..=10
//! ├── bendingAngles      [segments]      degrees
//! ├── rotationAngles     [segments]      degrees
//! ├── backboneLengths    [segments]      meters
//! ├── couplingLengths    [segments + 1]  meters
//! ├── discretizationSteps
//! └── tendonConfig?      { count, radius[segments + 1], couplingOffset }
//! ```
//!
//! The array lengths are kept consistent by [`RobotParameterState::apply`],
//! which every mutation goes through. Out-of-range input is corrected here,
//! never rejected; rejection happens in [`crate::validation`].
//!
//! ## Example
//!
//! ```rust
//! use robot_core::config::ParameterDefaults;
//! use robot_core::parameters::{ParameterUpdate, RobotParameterState};
//!
//! let defaults = ParameterDefaults::default();
//! let state = RobotParameterState::from_defaults(&defaults);
//!
//! let grown = state.apply(ParameterUpdate::new().segments(5), &defaults);
//! assert_eq!(grown.bending_angles.len(), 5);
//! assert_eq!(grown.coupling_lengths.len(), 6);
//! ```

use serde::{Deserialize, Serialize};

use crate::arrays::resize;
use crate::config::ParameterDefaults;
use crate::tendon::{TendonConfig, TendonConfigInput};

/// Fewest segments a robot may have
pub const MIN_SEGMENTS: u32 = 1;
/// Most segments a robot may have
pub const MAX_SEGMENTS: u32 = 10;

/// Clamp a requested segment count into `MIN_SEGMENTS..=MAX_SEGMENTS`.
pub fn clamp_segments(requested: i64) -> u32 {
    requested.clamp(i64::from(MIN_SEGMENTS), i64::from(MAX_SEGMENTS)) as u32
}

/// The canonical editable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotParameterState {
    /// Number of segments (1..=10)
    pub segments: u32,

    /// Bending angle per segment, degrees
    pub bending_angles: Vec<f64>,

    /// Rotation angle per segment, degrees from the x-axis
    pub rotation_angles: Vec<f64>,

    /// Backbone length per segment, meters
    pub backbone_lengths: Vec<f64>,

    /// Coupling length per coupling (base coupling included), meters
    pub coupling_lengths: Vec<f64>,

    /// Solver resolution per backbone
    pub discretization_steps: u32,

    /// Tendon routing, if the robot is tendon-driven
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tendon_config: Option<TendonConfig>,
}

impl RobotParameterState {
    /// Fresh configuration built entirely from defaults.
    pub fn from_defaults(defaults: &ParameterDefaults) -> Self {
        let segments = clamp_segments(i64::from(defaults.segments));
        let n = segments as usize;
        RobotParameterState {
            segments,
            bending_angles: vec![defaults.bending_angle_deg; n],
            rotation_angles: vec![defaults.rotation_angle_deg; n],
            backbone_lengths: vec![defaults.backbone_length_m; n],
            coupling_lengths: vec![defaults.coupling_length_m; n + 1],
            discretization_steps: defaults.discretization_steps,
            tendon_config: Some(TendonConfig::uniform(
                defaults.tendon_count,
                defaults.tendon_radius_m,
                n + 1,
            )),
        }
    }

    /// Number of couplings, always `segments + 1`
    pub fn coupling_count(&self) -> usize {
        self.segments as usize + 1
    }

    /// Whether every parallel array has the length `segments` demands.
    pub fn satisfies_length_invariant(&self) -> bool {
        let n = self.segments as usize;
        let tendons_ok = self
            .tendon_config
            .as_ref()
            .map_or(true, |t| t.radius.len() == n + 1);
        (MIN_SEGMENTS..=MAX_SEGMENTS).contains(&self.segments)
            && self.bending_angles.len() == n
            && self.rotation_angles.len() == n
            && self.backbone_lengths.len() == n
            && self.coupling_lengths.len() == n + 1
            && tendons_ok
    }

    /// Merge `update` into this state and restore the length invariant.
    ///
    /// The merge is shallow: an array or tendon block present in the update
    /// replaces the previous one wholesale. Afterwards `segments` is clamped
    /// and every dependent array is resized to match, preserving its prefix
    /// and padding new slots from `defaults`. This runs unconditionally, so a
    /// stale array supplied alongside an unchanged segment count is corrected
    /// as well.
    pub fn apply(&self, update: ParameterUpdate, defaults: &ParameterDefaults) -> Self {
        let segments = update
            .segments
            .map(clamp_segments)
            .unwrap_or(self.segments);

        let merged = RobotParameterState {
            segments,
            bending_angles: update.bending_angles.unwrap_or_else(|| self.bending_angles.clone()),
            rotation_angles: update.rotation_angles.unwrap_or_else(|| self.rotation_angles.clone()),
            backbone_lengths: update.backbone_lengths.unwrap_or_else(|| self.backbone_lengths.clone()),
            coupling_lengths: update.coupling_lengths.unwrap_or_else(|| self.coupling_lengths.clone()),
            discretization_steps: update.discretization_steps.unwrap_or(self.discretization_steps),
            tendon_config: match update.tendon_config {
                Some(replacement) => replacement,
                None => self.tendon_config.clone(),
            },
        };

        merged.normalized(defaults)
    }

    /// Resize every dependent array to the (clamped) segment count.
    pub fn normalized(mut self, defaults: &ParameterDefaults) -> Self {
        self.segments = clamp_segments(i64::from(self.segments));
        let n = self.segments as usize;

        self.bending_angles = resize(&self.bending_angles, n, defaults.bending_angle_deg);
        self.rotation_angles = resize(&self.rotation_angles, n, defaults.rotation_angle_deg);
        self.backbone_lengths = resize(&self.backbone_lengths, n, defaults.backbone_length_m);
        self.coupling_lengths = resize(&self.coupling_lengths, n + 1, defaults.coupling_length_m);
        if let Some(tendons) = self.tendon_config.as_mut() {
            tendons.radius = resize(&tendons.radius, n + 1, defaults.tendon_radius_m);
        }
        self
    }
}

/// A partial update to [`RobotParameterState`].
///
/// `segments` is signed so out-of-range input (0, negatives) can be clamped
/// rather than rejected. `tendon_config` is doubly optional: `None` leaves
/// tendons untouched, `Some(None)` removes them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterUpdate {
    pub segments: Option<i64>,
    pub bending_angles: Option<Vec<f64>>,
    pub rotation_angles: Option<Vec<f64>>,
    pub backbone_lengths: Option<Vec<f64>>,
    pub coupling_lengths: Option<Vec<f64>>,
    pub discretization_steps: Option<u32>,
    pub tendon_config: Option<Option<TendonConfig>>,
}

impl ParameterUpdate {
    pub fn new() -> Self {
        ParameterUpdate::default()
    }

    /// An update that replaces every field with `state`.
    pub fn replace_all(state: RobotParameterState) -> Self {
        ParameterUpdate {
            segments: Some(i64::from(state.segments)),
            bending_angles: Some(state.bending_angles),
            rotation_angles: Some(state.rotation_angles),
            backbone_lengths: Some(state.backbone_lengths),
            coupling_lengths: Some(state.coupling_lengths),
            discretization_steps: Some(state.discretization_steps),
            tendon_config: Some(state.tendon_config),
        }
    }

    pub fn segments(mut self, segments: i64) -> Self {
        self.segments = Some(segments);
        self
    }

    pub fn bending_angles(mut self, values: Vec<f64>) -> Self {
        self.bending_angles = Some(values);
        self
    }

    pub fn rotation_angles(mut self, values: Vec<f64>) -> Self {
        self.rotation_angles = Some(values);
        self
    }

    pub fn backbone_lengths(mut self, values: Vec<f64>) -> Self {
        self.backbone_lengths = Some(values);
        self
    }

    pub fn coupling_lengths(mut self, values: Vec<f64>) -> Self {
        self.coupling_lengths = Some(values);
        self
    }

    pub fn discretization_steps(mut self, steps: u32) -> Self {
        self.discretization_steps = Some(steps);
        self
    }

    pub fn tendon_config(mut self, config: TendonConfig) -> Self {
        self.tendon_config = Some(Some(config));
        self
    }

    pub fn without_tendons(mut self) -> Self {
        self.tendon_config = Some(None);
        self
    }

    /// True when the update touches nothing.
    pub fn is_empty(&self) -> bool {
        *self == ParameterUpdate::default()
    }
}

/// Configuration-shaped payload where every field may be missing.
///
/// Presets and stored sessions come in this shape. [`ParameterPayload::into_state`]
/// fills the gaps from defaults and normalizes array lengths, including the
/// legacy scalar tendon radius.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterPayload {
    #[serde(default)]
    pub segments: Option<i64>,
    #[serde(default)]
    pub bending_angles: Option<Vec<f64>>,
    #[serde(default)]
    pub rotation_angles: Option<Vec<f64>>,
    #[serde(default)]
    pub backbone_lengths: Option<Vec<f64>>,
    #[serde(default)]
    pub coupling_lengths: Option<Vec<f64>>,
    #[serde(default)]
    pub discretization_steps: Option<u32>,
    #[serde(default)]
    pub tendon_config: Option<TendonConfigInput>,
}

impl ParameterPayload {
    /// Segment count the payload implies: explicit, else the longest
    /// per-segment array, else the default.
    fn implied_segments(&self, defaults: &ParameterDefaults) -> u32 {
        if let Some(segments) = self.segments {
            return clamp_segments(segments);
        }
        let from_arrays = [
            self.bending_angles.as_ref(),
            self.rotation_angles.as_ref(),
            self.backbone_lengths.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(Vec::len)
        .max();
        match from_arrays {
            Some(len) if len > 0 => clamp_segments(len as i64),
            _ => clamp_segments(i64::from(defaults.segments)),
        }
    }

    /// Build a complete, invariant-satisfying state.
    pub fn into_state(self, defaults: &ParameterDefaults) -> RobotParameterState {
        let segments = self.implied_segments(defaults);
        let couplings = segments as usize + 1;
        let tendon_config = self
            .tendon_config
            .map(|t| t.normalize(couplings, defaults.tendon_count, defaults.tendon_radius_m));

        RobotParameterState {
            segments,
            bending_angles: self.bending_angles.unwrap_or_default(),
            rotation_angles: self.rotation_angles.unwrap_or_default(),
            backbone_lengths: self.backbone_lengths.unwrap_or_default(),
            coupling_lengths: self.coupling_lengths.unwrap_or_default(),
            discretization_steps: self.discretization_steps.unwrap_or(defaults.discretization_steps),
            tendon_config,
        }
        .normalized(defaults)
    }
}

impl From<&RobotParameterState> for ParameterPayload {
    fn from(state: &RobotParameterState) -> Self {
        ParameterPayload {
            segments: Some(i64::from(state.segments)),
            bending_angles: Some(state.bending_angles.clone()),
            rotation_angles: Some(state.rotation_angles.clone()),
            backbone_lengths: Some(state.backbone_lengths.clone()),
            coupling_lengths: Some(state.coupling_lengths.clone()),
            discretization_steps: Some(state.discretization_steps),
            tendon_config: state.tendon_config.as_ref().map(TendonConfigInput::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tendon::RadiusInput;

    fn five_segment_state() -> RobotParameterState {
        RobotParameterState {
            segments: 5,
            bending_angles: vec![10.0, 20.0, 30.0, 40.0, 50.0],
            rotation_angles: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            backbone_lengths: vec![0.07, 0.08, 0.09, 0.10, 0.11],
            coupling_lengths: vec![0.01, 0.02, 0.03, 0.04, 0.05, 0.06],
            discretization_steps: 1000,
            tendon_config: Some(TendonConfig {
                count: 3,
                radius: vec![0.031, 0.032, 0.033, 0.034, 0.035, 0.036],
                coupling_offset: 0.0,
            }),
        }
    }

    #[test]
    fn test_defaults_satisfy_invariant() {
        let state = RobotParameterState::from_defaults(&ParameterDefaults::default());
        assert_eq!(state.segments, 3);
        assert!(state.satisfies_length_invariant());
        assert_eq!(state.tendon_config.unwrap().radius, vec![0.03; 4]);
    }

    #[test]
    fn test_shrink_segments_keeps_prefix() {
        let defaults = ParameterDefaults::default();
        let state = five_segment_state().apply(ParameterUpdate::new().segments(3), &defaults);

        assert_eq!(state.segments, 3);
        assert_eq!(state.bending_angles, vec![10.0, 20.0, 30.0]);
        assert_eq!(state.rotation_angles, vec![1.0, 2.0, 3.0]);
        assert_eq!(state.backbone_lengths, vec![0.07, 0.08, 0.09]);
        assert_eq!(state.coupling_lengths, vec![0.01, 0.02, 0.03, 0.04]);
        assert_eq!(state.tendon_config.unwrap().radius, vec![0.031, 0.032, 0.033, 0.034]);
    }

    #[test]
    fn test_grow_segments_pads_defaults() {
        let defaults = ParameterDefaults::default();
        let state = five_segment_state().apply(ParameterUpdate::new().segments(7), &defaults);

        assert_eq!(state.bending_angles, vec![10.0, 20.0, 30.0, 40.0, 50.0, 0.0, 0.0]);
        assert_eq!(&state.backbone_lengths[5..], &[0.07, 0.07]);
        assert_eq!(state.coupling_lengths.len(), 8);
        assert_eq!(state.coupling_lengths[7], defaults.coupling_length_m);
        let radius = state.tendon_config.unwrap().radius;
        assert_eq!(radius.len(), 8);
        assert_eq!(radius[7], defaults.tendon_radius_m);
    }

    #[test]
    fn test_out_of_range_segments_clamped() {
        let defaults = ParameterDefaults::default();
        let state = five_segment_state();

        let low = state.apply(ParameterUpdate::new().segments(0), &defaults);
        assert_eq!(low.segments, 1);
        assert!(low.satisfies_length_invariant());

        let negative = state.apply(ParameterUpdate::new().segments(-4), &defaults);
        assert_eq!(negative.segments, 1);

        let high = state.apply(ParameterUpdate::new().segments(42), &defaults);
        assert_eq!(high.segments, 10);
        assert_eq!(high.coupling_lengths.len(), 11);
    }

    #[test]
    fn test_stale_radius_normalized_without_segment_change() {
        let defaults = ParameterDefaults::default();
        let stale = TendonConfig {
            count: 4,
            radius: vec![0.02, 0.02],
            coupling_offset: 0.0,
        };
        let state = five_segment_state().apply(ParameterUpdate::new().tendon_config(stale), &defaults);

        assert_eq!(state.segments, 5);
        let tendons = state.tendon_config.unwrap();
        assert_eq!(tendons.count, 4);
        assert_eq!(tendons.radius, vec![0.02, 0.02, 0.03, 0.03, 0.03, 0.03]);
    }

    #[test]
    fn test_stale_arrays_normalized_without_segment_change() {
        let defaults = ParameterDefaults::default();
        let state = five_segment_state().apply(ParameterUpdate::new().bending_angles(vec![1.0]), &defaults);
        assert_eq!(state.bending_angles, vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(state.satisfies_length_invariant());
    }

    #[test]
    fn test_update_arrays_replace_not_merge() {
        let defaults = ParameterDefaults::default();
        let update = ParameterUpdate::new()
            .segments(2)
            .bending_angles(vec![90.0, 45.0])
            .coupling_lengths(vec![0.5, 0.5, 0.5]);
        let state = five_segment_state().apply(update, &defaults);

        assert_eq!(state.bending_angles, vec![90.0, 45.0]);
        assert_eq!(state.coupling_lengths, vec![0.5, 0.5, 0.5]);
        assert_eq!(state.rotation_angles, vec![1.0, 2.0]);
    }

    #[test]
    fn test_remove_tendons() {
        let defaults = ParameterDefaults::default();
        let state = five_segment_state().apply(ParameterUpdate::new().without_tendons(), &defaults);
        assert!(state.tendon_config.is_none());
        assert!(state.satisfies_length_invariant());
    }

    #[test]
    fn test_invariant_holds_over_edit_sequence() {
        let defaults = ParameterDefaults::default();
        let mut state = RobotParameterState::from_defaults(&defaults);
        for requested in [5, 1, 10, 11, -3, 0, 7, 7, 2, 9, 100] {
            state = state.apply(ParameterUpdate::new().segments(requested), &defaults);
            let n = state.segments as usize;
            assert_eq!(n as i64, requested.clamp(1, 10));
            assert_eq!(state.bending_angles.len(), n);
            assert_eq!(state.rotation_angles.len(), n);
            assert_eq!(state.backbone_lengths.len(), n);
            assert_eq!(state.coupling_lengths.len(), n + 1);
            assert_eq!(state.tendon_config.as_ref().unwrap().radius.len(), n + 1);
        }
    }

    #[test]
    fn test_payload_missing_fields() {
        let defaults = ParameterDefaults::default();
        let payload: ParameterPayload = serde_json::from_str(
            r#"{"bendingAngles": [10, 20], "tendonConfig": {"count": 4, "radius": 0.025}}"#,
        )
        .unwrap();
        let state = payload.into_state(&defaults);

        assert_eq!(state.segments, 2);
        assert_eq!(state.bending_angles, vec![10.0, 20.0]);
        assert_eq!(state.rotation_angles, vec![0.0, 0.0]);
        assert_eq!(state.backbone_lengths, vec![0.07, 0.07]);
        assert_eq!(state.coupling_lengths, vec![0.03; 3]);
        assert_eq!(state.discretization_steps, defaults.discretization_steps);
        let tendons = state.tendon_config.unwrap();
        assert_eq!(tendons.count, 4);
        assert_eq!(tendons.radius, vec![0.025; 3]);
    }

    #[test]
    fn test_payload_roundtrip_from_state() {
        let defaults = ParameterDefaults::default();
        let state = five_segment_state();
        let payload = ParameterPayload::from(&state);
        assert!(matches!(
            payload.tendon_config.as_ref().unwrap().radius,
            Some(RadiusInput::PerCoupling(_))
        ));
        assert_eq!(payload.into_state(&defaults), state);
    }

    #[test]
    fn test_state_wire_names() {
        let json = serde_json::to_value(five_segment_state()).unwrap();
        assert!(json.get("bendingAngles").is_some());
        assert!(json.get("couplingLengths").is_some());
        assert!(json.get("tendonConfig").is_some());
        assert!(json.get("discretizationSteps").is_some());
    }
}
