//! # Computation Pipeline
//!
//! Turns the current parameters into a new [`ComputedConfiguration`]:
//!
//! ```text
//! idle -> validating -> submitting -> idle      (solver succeeded)
//! idle -> validating -> failed -> idle          (validation or solver error)
//! ```
//!
//! Guarantees:
//! - at most one current solver call; a second `submit` while one is
//!   pending returns [`SubmitOutcome::Skipped`] and is not queued
//! - no solver call while validation fails or a preset load is running
//! - the published snapshot is replaced whole, and only on success
//! - a preset load releases the compute marker; the older call's result is
//!   dropped when it arrives, so a fresh submit may run alongside it
//! - dropping a `submit` future mid-solve releases the compute marker
//!
//! Scheduling is single-threaded: the pipeline is shared through `Rc` and
//! [`ComputationPipeline::request_debounced`] spawns onto the current
//! `tokio::task::LocalSet`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::computed::{ComputedConfiguration, OperationKind, PendingOperation};
use crate::config::SessionConfig;
use crate::errors::{RobotError, RobotResult, SurfacedError};
use crate::solver::{Solver, SolverRequest};
use crate::store::SharedStore;
use crate::validation::validate;

/// Where the pipeline is in its submit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Validating,
    Submitting,
    Failed,
}

/// Why a submit did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ComputeInFlight,
    PresetLoadInProgress,
}

/// Result of one `submit` call.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Solver succeeded and the snapshot was replaced
    Completed,
    /// Nothing was done
    Skipped(SkipReason),
    /// The validation gate refused the configuration; the solver was not called
    Rejected(SurfacedError),
    /// The solver call failed; the snapshot is unchanged
    Failed(SurfacedError),
    /// A preset load started while the solver was running; its result (or
    /// error) is dropped
    Superseded,
}

/// Releases the compute marker when a submit ends, including when its
/// future is dropped while the solver call is pending.
struct ComputeGuard<'a, S: Solver> {
    pipeline: &'a ComputationPipeline<S>,
    id: Uuid,
    finished: bool,
}

impl<S: Solver> Drop for ComputeGuard<'_, S> {
    fn drop(&mut self) {
        let released = self.pipeline.release_compute(self.id);
        if released && !self.finished {
            log::warn!("Computation {} abandoned before the solver returned", self.id);
            self.pipeline.transition(PipelineState::Idle);
        }
    }
}

struct ShownError {
    error: SurfacedError,
    shown_at: Instant,
}

/// Debounced, validated, single-flight solver submission.
pub struct ComputationPipeline<S> {
    store: SharedStore,
    solver: S,
    config: SessionConfig,
    state: Cell<PipelineState>,
    compute: RefCell<Option<PendingOperation>>,
    preset_load: RefCell<Option<PendingOperation>>,
    /// Bumped by every preset load so in-flight results can tell they are stale
    epoch: Cell<u64>,
    debounce: RefCell<Option<JoinHandle<()>>>,
    error: RefCell<Option<ShownError>>,
    computed: watch::Sender<Arc<ComputedConfiguration>>,
    solver_calls: Cell<u64>,
}

impl<S: Solver> ComputationPipeline<S> {
    pub fn new(store: SharedStore, solver: S, config: SessionConfig) -> Rc<Self> {
        let (computed, _) = watch::channel(Arc::new(ComputedConfiguration::Empty));
        Rc::new(ComputationPipeline {
            store,
            solver,
            config,
            state: Cell::new(PipelineState::Idle),
            compute: RefCell::new(None),
            preset_load: RefCell::new(None),
            epoch: Cell::new(0),
            debounce: RefCell::new(None),
            error: RefCell::new(None),
            computed,
            solver_calls: Cell::new(0),
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    /// The compute operation in flight, if any
    pub fn pending(&self) -> Option<PendingOperation> {
        self.compute.borrow().clone()
    }

    /// Number of solver calls made so far
    pub fn solver_calls(&self) -> u64 {
        self.solver_calls.get()
    }

    /// Validate the current parameters and, if they pass, solve them.
    pub async fn submit(&self) -> SubmitOutcome {
        if self.compute.borrow().is_some() {
            log::debug!("Submit ignored: a computation is already in flight");
            return SubmitOutcome::Skipped(SkipReason::ComputeInFlight);
        }
        if self.is_preset_loading() {
            log::debug!("Submit ignored: preset load in progress");
            return SubmitOutcome::Skipped(SkipReason::PresetLoadInProgress);
        }

        self.transition(PipelineState::Validating);
        let parameters = self.store.borrow().snapshot();
        if let Err(err) = validate(&parameters) {
            let surfaced = self.surface_error(&err);
            self.transition(PipelineState::Failed);
            self.transition(PipelineState::Idle);
            return SubmitOutcome::Rejected(surfaced);
        }

        let operation = PendingOperation::start(OperationKind::Compute);
        log::info!(
            "Submitting {}-segment configuration (operation {})",
            parameters.segments,
            operation.id
        );
        let mut guard = ComputeGuard {
            pipeline: self,
            id: operation.id,
            finished: false,
        };
        *self.compute.borrow_mut() = Some(operation);
        let epoch = self.epoch.get();
        self.transition(PipelineState::Submitting);
        self.solver_calls.set(self.solver_calls.get() + 1);

        let result = self.solver.solve(SolverRequest::from_state(&parameters)).await;
        guard.finished = true;
        drop(guard);

        if self.epoch.get() != epoch {
            // the preset load already reset the state; a newer submit may own it now
            log::info!("Dropping solver result: a preset was loaded while it was computing");
            return SubmitOutcome::Superseded;
        }

        match result {
            Ok(shape) => {
                self.publish(ComputedConfiguration::solved(parameters, shape));
                self.transition(PipelineState::Idle);
                SubmitOutcome::Completed
            }
            Err(e) => {
                let surfaced = self.surface_error(&RobotError::from(e));
                self.transition(PipelineState::Failed);
                self.transition(PipelineState::Idle);
                SubmitOutcome::Failed(surfaced)
            }
        }
    }

    /// Run `submit` once the settle window passes without another request.
    ///
    /// Each call cancels the timer armed by the previous one. Must be called
    /// from inside a `LocalSet`.
    pub fn request_debounced(self: &Rc<Self>)
    where
        S: 'static,
    {
        self.cancel_debounce();
        let pipeline = Rc::clone(self);
        let window = self.config.debounce_window();
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(window).await;
            // disarm before submitting so a new request cannot abort a running solve
            pipeline.debounce.borrow_mut().take();
            pipeline.submit().await;
        });
        *self.debounce.borrow_mut() = Some(handle);
    }

    /// Whether a debounced submit is armed and has not fired yet
    pub fn has_scheduled_submit(&self) -> bool {
        self.debounce.borrow().is_some()
    }

    /// Cancel an armed debounce timer, if any.
    pub fn cancel_debounce(&self) {
        if let Some(handle) = self.debounce.borrow_mut().take() {
            handle.abort();
        }
    }

    /// React to an edit. Schedules a debounced recompute unless auto-recompute
    /// is off or a preset load is replacing the parameters.
    ///
    /// Returns whether a recompute was scheduled.
    pub fn notify_parameters_changed(self: &Rc<Self>) -> bool
    where
        S: 'static,
    {
        if !self.config.auto_recompute || self.is_preset_loading() {
            return false;
        }
        self.request_debounced();
        true
    }

    // ------------------------------------------------------------------
    // Snapshot publication
    // ------------------------------------------------------------------

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<ComputedConfiguration> {
        self.computed.borrow().clone()
    }

    /// Subscribe to snapshot replacements (the renderer's view).
    pub fn subscribe(&self) -> watch::Receiver<Arc<ComputedConfiguration>> {
        self.computed.subscribe()
    }

    pub(crate) fn publish(&self, snapshot: ComputedConfiguration) {
        self.computed.send_replace(Arc::new(snapshot));
    }

    // ------------------------------------------------------------------
    // Preset-load coordination
    // ------------------------------------------------------------------

    pub fn is_preset_loading(&self) -> bool {
        self.preset_load.borrow().is_some()
    }

    /// Mark a preset load as started. Rejects a second concurrent load.
    pub(crate) fn begin_preset_load(&self) -> RobotResult<PendingOperation> {
        if self.is_preset_loading() {
            return Err(RobotError::PresetLoadInProgress);
        }
        let operation = PendingOperation::start(OperationKind::PresetLoad);
        *self.preset_load.borrow_mut() = Some(operation.clone());
        self.epoch.set(self.epoch.get() + 1);
        self.cancel_debounce();
        let stale = self.compute.borrow_mut().take();
        if let Some(stale) = stale {
            log::info!("Preset load supersedes computation {}", stale.id);
            self.transition(PipelineState::Idle);
        }
        Ok(operation)
    }

    pub(crate) fn end_preset_load(&self) {
        self.preset_load.borrow_mut().take();
    }

    // ------------------------------------------------------------------
    // Error display
    // ------------------------------------------------------------------

    /// Record an error for display and return its user-facing form.
    pub fn surface_error(&self, error: &RobotError) -> SurfacedError {
        let surfaced = SurfacedError::from(error);
        log::warn!("{}", surfaced);
        *self.error.borrow_mut() = Some(ShownError {
            error: surfaced.clone(),
            shown_at: Instant::now(),
        });
        surfaced
    }

    /// The error currently on display; clears itself after the display window.
    pub fn current_error(&self) -> Option<SurfacedError> {
        let mut slot = self.error.borrow_mut();
        let expired = slot
            .as_ref()
            .is_some_and(|shown| shown.shown_at.elapsed() >= self.config.error_display_window());
        if expired {
            *slot = None;
        }
        slot.as_ref().map(|shown| shown.error.clone())
    }

    pub fn dismiss_error(&self) {
        self.error.borrow_mut().take();
    }

    /// Clear the compute marker if it still belongs to `id`.
    fn release_compute(&self, id: Uuid) -> bool {
        let mut slot = self.compute.borrow_mut();
        if slot.as_ref().is_some_and(|op| op.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn transition(&self, next: PipelineState) {
        let previous = self.state.replace(next);
        log::debug!("Pipeline {:?} -> {:?}", previous, next);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::errors::{ErrorKind, SolverError};
    use crate::parameters::ParameterUpdate;
    use crate::storage::MemoryStorage;
    use crate::store::ParameterStore;
    use crate::testing::{shape_for, ScriptedSolver};

    fn pipeline_with(solver: ScriptedSolver) -> Rc<ComputationPipeline<ScriptedSolver>> {
        let config = SessionConfig::default();
        let store = ParameterStore::shared(Box::new(MemoryStorage::new()), &config);
        ComputationPipeline::new(store, solver, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_success_publishes_snapshot() {
        let pipeline = pipeline_with(ScriptedSolver::echo());
        assert!(pipeline.snapshot().is_empty());

        assert_eq!(pipeline.submit().await, SubmitOutcome::Completed);
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(pipeline.pending().is_none());

        let snapshot = pipeline.snapshot();
        let params = snapshot.parameters().unwrap();
        assert_eq!(params, pipeline.store().borrow().get());
        assert_eq!(snapshot.shape().unwrap().segment_count(), params.segments as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_rejection_skips_solver() {
        let pipeline = pipeline_with(ScriptedSolver::echo());
        pipeline.store().borrow_mut().set(ParameterUpdate::new().discretization_steps(0));

        match pipeline.submit().await {
            SubmitOutcome::Rejected(err) => {
                assert_eq!(err.kind, ErrorKind::Validation);
                assert_eq!(err.message, "Discretization steps must be positive");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(pipeline.solver().calls().len(), 0);
        assert!(pipeline.snapshot().is_empty());
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_finite_angle_never_reaches_solver() {
        let pipeline = pipeline_with(ScriptedSolver::echo());
        pipeline
            .store()
            .borrow_mut()
            .set(ParameterUpdate::new().bending_angles(vec![f64::NAN, 0.0, 0.0]));

        assert!(matches!(pipeline.submit().await, SubmitOutcome::Rejected(_)));
        assert_eq!(pipeline.solver_calls(), 0);
        assert!(pipeline.current_error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_compute_in_flight() {
        let pipeline = pipeline_with(ScriptedSolver::echo().with_latency(Duration::from_millis(500)));

        let (first, second) = tokio::join!(pipeline.submit(), pipeline.submit());
        assert_eq!(first, SubmitOutcome::Completed);
        assert_eq!(second, SubmitOutcome::Skipped(SkipReason::ComputeInFlight));
        assert_eq!(pipeline.solver().calls().len(), 1);
        assert_eq!(pipeline.solver_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_marker_while_submitting() {
        let pipeline = pipeline_with(ScriptedSolver::echo().with_latency(Duration::from_millis(100)));

        let observe = async {
            tokio::task::yield_now().await;
            let pending = pipeline.pending().expect("compute should be pending");
            assert_eq!(pending.kind, OperationKind::Compute);
            assert_eq!(pipeline.state(), PipelineState::Submitting);
        };
        let (outcome, _) = tokio::join!(pipeline.submit(), observe);
        assert_eq!(outcome, SubmitOutcome::Completed);
        assert!(pipeline.pending().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_solver_failure_keeps_previous_snapshot() {
        let solver = ScriptedSolver::echo();
        let pipeline = pipeline_with(solver);
        assert_eq!(pipeline.submit().await, SubmitOutcome::Completed);
        let before = pipeline.snapshot();

        pipeline.solver().fail_next(SolverError::Status { code: 500, body: "solver crashed".into() });
        pipeline.store().borrow_mut().set(ParameterUpdate::new().segments(6));

        match pipeline.submit().await {
            SubmitOutcome::Failed(err) => assert_eq!(err.kind, ErrorKind::Server),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(pipeline.snapshot(), before);
        assert_eq!(pipeline.store().borrow().get().segments, 6);
        assert!(pipeline.pending().is_none());
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_classified() {
        let pipeline = pipeline_with(ScriptedSolver::echo());
        pipeline.solver().fail_next(SolverError::Timeout);
        match pipeline.submit().await {
            SubmitOutcome::Failed(err) => assert_eq!(err.kind, ErrorKind::Network),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_auto_clears_after_display_window() {
        let pipeline = pipeline_with(ScriptedSolver::echo());
        pipeline.solver().fail_next(SolverError::Unreachable { reason: "refused".into() });
        pipeline.submit().await;

        assert!(pipeline.current_error().is_some());
        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(pipeline.current_error().is_some());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(pipeline.current_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_error() {
        let pipeline = pipeline_with(ScriptedSolver::echo());
        pipeline.surface_error(&RobotError::validation("x", "bad"));
        pipeline.dismiss_error();
        assert!(pipeline.current_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_to_last_state() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let pipeline = pipeline_with(ScriptedSolver::echo());

                for angle in [10.0, 20.0, 30.0, 40.0, 50.0] {
                    pipeline
                        .store()
                        .borrow_mut()
                        .set(ParameterUpdate::new().bending_angles(vec![angle, 0.0, 0.0]));
                    pipeline.request_debounced();
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                assert!(pipeline.has_scheduled_submit());
                assert!(pipeline.solver().calls().is_empty());

                tokio::time::sleep(Duration::from_millis(300)).await;

                let calls = pipeline.solver().calls();
                assert_eq!(calls.len(), 1);
                assert!((calls[0].bending_angles[0].0 - 50f64.to_radians()).abs() < 1e-12);
                assert!(!pipeline.has_scheduled_submit());
                assert!(!pipeline.snapshot().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_fire_separately() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let pipeline = pipeline_with(ScriptedSolver::echo());
                pipeline.request_debounced();
                tokio::time::sleep(Duration::from_millis(250)).await;
                pipeline.request_debounced();
                tokio::time::sleep(Duration::from_millis(250)).await;
                assert_eq!(pipeline.solver().calls().len(), 2);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_respects_auto_recompute() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut config = SessionConfig::default();
                config.auto_recompute = false;
                let store = ParameterStore::shared(Box::new(MemoryStorage::new()), &config);
                let pipeline = ComputationPipeline::new(store, ScriptedSolver::echo(), config);

                assert!(!pipeline.notify_parameters_changed());
                assert!(!pipeline.has_scheduled_submit());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_preset_flag_suppresses_reactions() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let pipeline = pipeline_with(ScriptedSolver::echo());
                pipeline.request_debounced();
                pipeline.begin_preset_load().unwrap();

                assert!(!pipeline.has_scheduled_submit());
                assert!(!pipeline.notify_parameters_changed());
                assert_eq!(
                    pipeline.submit().await,
                    SubmitOutcome::Skipped(SkipReason::PresetLoadInProgress)
                );
                assert!(matches!(pipeline.begin_preset_load(), Err(RobotError::PresetLoadInProgress)));

                pipeline.end_preset_load();
                assert!(pipeline.notify_parameters_changed());
                tokio::time::sleep(Duration::from_millis(250)).await;
                assert_eq!(pipeline.solver().calls().len(), 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_superseded_by_preset_load() {
        let pipeline = pipeline_with(ScriptedSolver::echo().with_latency(Duration::from_millis(100)));

        let interrupt = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            pipeline.begin_preset_load().unwrap();
            pipeline.end_preset_load();
        };
        let (outcome, _) = tokio::join!(pipeline.submit(), interrupt);
        assert_eq!(outcome, SubmitOutcome::Superseded);
        assert!(pipeline.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_submit_releases_marker() {
        let pipeline = pipeline_with(ScriptedSolver::echo().with_latency(Duration::from_millis(500)));

        let abandoned = tokio::time::timeout(Duration::from_millis(10), pipeline.submit()).await;
        assert!(abandoned.is_err());
        assert!(pipeline.pending().is_none());
        assert_eq!(pipeline.state(), PipelineState::Idle);

        assert_eq!(pipeline.submit().await, SubmitOutcome::Completed);
        assert_eq!(pipeline.solver_calls(), 2);
        assert!(!pipeline.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_preset_load_releases_stale_compute() {
        let pipeline = pipeline_with(ScriptedSolver::echo().with_latency(Duration::from_millis(100)));

        let reload = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            pipeline.begin_preset_load().unwrap();
            assert!(pipeline.pending().is_none());
            assert_eq!(pipeline.state(), PipelineState::Idle);
            pipeline.end_preset_load();
            pipeline.submit().await
        };
        let (first, fresh) = tokio::join!(pipeline.submit(), reload);
        assert_eq!(first, SubmitOutcome::Superseded);
        assert_eq!(fresh, SubmitOutcome::Completed);
        assert!(pipeline.pending().is_none());
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(!pipeline.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_sees_whole_snapshots() {
        let pipeline = pipeline_with(ScriptedSolver::echo());
        let mut rx = pipeline.subscribe();

        pipeline.submit().await;
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        let params = seen.parameters().unwrap();
        assert_eq!(seen.shape(), Some(&shape_for(params)));
    }
}
