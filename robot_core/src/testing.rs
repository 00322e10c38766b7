//! Fake collaborators for tests.
//!
//! Available to this crate's tests and, with the `testing` feature, to
//! downstream crates.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;

use crate::errors::{RobotError, RobotResult, SolverError};
use crate::parameters::RobotParameterState;
use crate::preset::{Preset, PresetDraft, PresetPatch, PresetSource};
use crate::solver::{Point3, Solver, SolverRequest, SolverResponse};

/// Deterministic straight-line shape: one two-point polyline per segment,
/// stacked along z by backbone plus coupling length.
pub fn shape_for_request(request: &SolverRequest) -> SolverResponse {
    let mut z = request.coupling_lengths.first().map_or(0.0, |m| m.0);
    let segments = request
        .backbone_lengths
        .iter()
        .enumerate()
        .map(|(i, length)| {
            let start: Point3 = [0.0, 0.0, z];
            z += length.0 + request.coupling_lengths.get(i + 1).map_or(0.0, |m| m.0);
            vec![start, [0.0, 0.0, z]]
        })
        .collect();
    SolverResponse {
        segments,
        tendons: None,
    }
}

/// Shape the echo solver produces for `state`.
pub fn shape_for(state: &RobotParameterState) -> SolverResponse {
    shape_for_request(&SolverRequest::from_state(state))
}

/// Solver that answers with [`shape_for_request`] after an optional latency,
/// unless a failure has been queued.
#[derive(Debug, Default)]
pub struct ScriptedSolver {
    latency: Duration,
    failures: RefCell<VecDeque<SolverError>>,
    calls: RefCell<Vec<SolverRequest>>,
}

impl ScriptedSolver {
    pub fn echo() -> Self {
        ScriptedSolver::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: SolverError) {
        self.failures.borrow_mut().push_back(error);
    }

    /// Every request received so far
    pub fn calls(&self) -> Vec<SolverRequest> {
        self.calls.borrow().clone()
    }
}

impl Solver for ScriptedSolver {
    async fn solve(&self, request: SolverRequest) -> Result<SolverResponse, SolverError> {
        self.calls.borrow_mut().push(request.clone());
        let failure = self.failures.borrow_mut().pop_front();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(shape_for_request(&request)),
        }
    }
}

/// In-memory preset collaborator.
#[derive(Debug, Default)]
pub struct MemoryPresetSource {
    presets: RefCell<Vec<Preset>>,
    next_id: Cell<i64>,
    offline: Cell<bool>,
}

impl MemoryPresetSource {
    pub fn new() -> Self {
        MemoryPresetSource {
            next_id: Cell::new(1),
            ..MemoryPresetSource::default()
        }
    }

    /// Add a preset directly, returning its id.
    pub fn insert(&self, name: &str, is_public: bool, configuration: serde_json::Value) -> i64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.presets.borrow_mut().push(Preset {
            id,
            name: name.to_string(),
            description: None,
            is_public,
            segments: configuration
                .get("segments")
                .and_then(serde_json::Value::as_u64)
                .map(|s| s as u32),
            tendon_count: None,
            configuration,
            created_at: Utc::now(),
            updated_at: None,
        });
        id
    }

    /// Make every call fail as if the service were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    fn check_online(&self, operation: &str) -> RobotResult<()> {
        if self.offline.get() {
            return Err(RobotError::preset_service(operation, "service unreachable"));
        }
        Ok(())
    }
}

impl PresetSource for MemoryPresetSource {
    async fn list_public_presets(&self) -> RobotResult<Vec<Preset>> {
        self.check_online("list public presets")?;
        Ok(self.presets.borrow().iter().filter(|p| p.is_public).cloned().collect())
    }

    async fn get_user_presets(&self) -> RobotResult<Vec<Preset>> {
        self.check_online("list user presets")?;
        Ok(self.presets.borrow().iter().filter(|p| !p.is_public).cloned().collect())
    }

    async fn get_preset(&self, id: i64) -> RobotResult<Preset> {
        self.check_online("get preset")?;
        self.presets
            .borrow()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(RobotError::PresetNotFound { preset_id: id })
    }

    async fn create_preset(&self, draft: PresetDraft) -> RobotResult<Preset> {
        self.check_online("create preset")?;
        let id = self.insert(&draft.name, draft.is_public, draft.configuration);
        let mut presets = self.presets.borrow_mut();
        let preset = presets
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RobotError::PresetNotFound { preset_id: id })?;
        preset.description = draft.description;
        Ok(preset.clone())
    }

    async fn update_preset(&self, id: i64, patch: PresetPatch) -> RobotResult<Preset> {
        self.check_online("update preset")?;
        let mut presets = self.presets.borrow_mut();
        let preset = presets
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RobotError::PresetNotFound { preset_id: id })?;
        if let Some(name) = patch.name {
            preset.name = name;
        }
        if let Some(description) = patch.description {
            preset.description = Some(description);
        }
        if let Some(is_public) = patch.is_public {
            preset.is_public = is_public;
        }
        if let Some(configuration) = patch.configuration {
            preset.configuration = configuration;
        }
        preset.updated_at = Some(Utc::now());
        Ok(preset.clone())
    }

    async fn delete_preset(&self, id: i64) -> RobotResult<()> {
        self.check_online("delete preset")?;
        let mut presets = self.presets.borrow_mut();
        let before = presets.len();
        presets.retain(|p| p.id != id);
        if presets.len() == before {
            return Err(RobotError::PresetNotFound { preset_id: id });
        }
        Ok(())
    }
}
