//! # Preset Load Transaction
//!
//! Replacing the whole configuration from a preset touches two reactive
//! chains at once: the parameter store (whose edits normally schedule a
//! recompute) and the published snapshot (which the renderer draws). Run
//! independently they would double-submit or briefly draw new parameters on
//! top of the old shape. The transaction serializes them:
//!
//! 1. mark the preset load (suppresses recompute reactions, rejects a second load)
//! 2. publish an empty snapshot, clearing the view
//! 3. replace the parameters through the store (invariants enforced as usual)
//! 4. hand off to subscribers, then publish the new parameters as the baseline
//!    and bump the reload key
//! 5. clear the preset-load mark
//! 6. run the caller's post-load callback, if any
//!
//! Step 4's hand-off yields to the scheduler once, or sleeps for
//! `settle_delay_ms` when that is configured.

use std::cell::Cell;
use std::rc::Rc;

use crate::computed::{ComputedConfiguration, PendingOperation};
use crate::errors::RobotResult;
use crate::parameters::{ParameterPayload, ParameterUpdate, RobotParameterState};
use crate::pipeline::ComputationPipeline;
use crate::preset::PresetSource;
use crate::solver::Solver;

/// What a finished load committed.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReceipt {
    pub operation: PendingOperation,
    /// Reload key after this load; views keyed on it must remount
    pub reload_key: u64,
    /// The parameters as committed (normalized)
    pub parameters: RobotParameterState,
}

/// Clears the preset-load mark even if the load future is dropped midway.
struct LoadGuard<'a, S: Solver> {
    pipeline: &'a ComputationPipeline<S>,
    finished: bool,
}

impl<S: Solver> Drop for LoadGuard<'_, S> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("Preset load abandoned before it finished");
        }
        self.pipeline.end_preset_load();
    }
}

/// Runs preset-load transactions against one pipeline.
pub struct PresetTransactionManager<S> {
    pipeline: Rc<ComputationPipeline<S>>,
    reload_key: Cell<u64>,
}

impl<S: Solver> PresetTransactionManager<S> {
    pub fn new(pipeline: Rc<ComputationPipeline<S>>) -> Self {
        PresetTransactionManager {
            pipeline,
            reload_key: Cell::new(0),
        }
    }

    pub fn pipeline(&self) -> &Rc<ComputationPipeline<S>> {
        &self.pipeline
    }

    /// Monotonic counter bumped by every completed load
    pub fn reload_key(&self) -> u64 {
        self.reload_key.get()
    }

    pub fn is_loading(&self) -> bool {
        self.pipeline.is_preset_loading()
    }

    /// Replace the configuration with `incoming`.
    pub async fn load(&self, incoming: RobotParameterState) -> RobotResult<LoadReceipt> {
        self.load_with(incoming, || {}).await
    }

    /// Replace the configuration and run `on_loaded` once the load is complete.
    ///
    /// Fails with `PresetLoadInProgress` if another load is mid-sequence.
    pub async fn load_with<F>(&self, incoming: RobotParameterState, on_loaded: F) -> RobotResult<LoadReceipt>
    where
        F: FnOnce(),
    {
        let operation = self.pipeline.begin_preset_load()?;
        let mut guard = LoadGuard {
            pipeline: &self.pipeline,
            finished: false,
        };
        log::info!("Loading {}-segment configuration (operation {})", incoming.segments, operation.id);

        self.pipeline.publish(ComputedConfiguration::Empty);

        let parameters = self
            .pipeline
            .store()
            .borrow_mut()
            .set(ParameterUpdate::replace_all(incoming))
            .clone();

        self.settle().await;

        self.pipeline.publish(ComputedConfiguration::Baseline {
            parameters: parameters.clone(),
        });
        let reload_key = self.reload_key.get() + 1;
        self.reload_key.set(reload_key);

        guard.finished = true;
        drop(guard);

        on_loaded();

        Ok(LoadReceipt {
            operation,
            reload_key,
            parameters,
        })
    }

    /// Normalize a preset-shaped payload and load it.
    pub async fn load_payload(&self, payload: ParameterPayload) -> RobotResult<LoadReceipt> {
        let defaults = self.pipeline.store().borrow().defaults().clone();
        self.load(payload.into_state(&defaults)).await
    }

    /// User-initiated load of a stored preset.
    ///
    /// Fetch failures and malformed payloads are surfaced through the
    /// pipeline's error display as well as returned.
    pub async fn load_preset<P: PresetSource>(&self, source: &P, preset_id: i64) -> RobotResult<LoadReceipt> {
        let result: RobotResult<LoadReceipt> = async {
            let preset = source.get_preset(preset_id).await?;
            let defaults = self.pipeline.store().borrow().defaults().clone();
            let state = preset.to_state(&defaults)?;
            self.load(state).await
        }
        .await;

        if let Err(e) = &result {
            self.pipeline.surface_error(e);
        }
        result
    }

    async fn settle(&self) {
        let delay = self.pipeline.config().settle_delay();
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
    }
}
