//! # Workbench Session
//!
//! Wires one parameter store, pipeline, transaction manager and auto-load
//! latch together. Front ends hold a `Workbench` and route edits through
//! [`Workbench::edit`] so every change goes through the store and then the
//! recompute reaction.

use std::rc::Rc;

use crate::autoload::{AutoLoadOutcome, AutoLoader};
use crate::config::SessionConfig;
use crate::parameters::{ParameterUpdate, RobotParameterState};
use crate::pipeline::ComputationPipeline;
use crate::preset::PresetSource;
use crate::solver::Solver;
use crate::storage::Storage;
use crate::store::{ParameterStore, SharedStore};
use crate::transaction::PresetTransactionManager;

pub struct Workbench<S> {
    transactions: PresetTransactionManager<S>,
    autoloader: AutoLoader,
}

impl<S: Solver + 'static> Workbench<S> {
    /// Restore parameters from `storage` and build the session around `solver`.
    pub fn open(storage: Box<dyn Storage>, solver: S, config: SessionConfig) -> Self {
        let store = ParameterStore::shared(storage, &config);
        let pipeline = ComputationPipeline::new(store, solver, config);
        Workbench {
            transactions: PresetTransactionManager::new(pipeline),
            autoloader: AutoLoader::new(),
        }
    }

    pub fn store(&self) -> &SharedStore {
        self.pipeline().store()
    }

    pub fn pipeline(&self) -> &Rc<ComputationPipeline<S>> {
        self.transactions.pipeline()
    }

    pub fn transactions(&self) -> &PresetTransactionManager<S> {
        &self.transactions
    }

    pub fn parameters(&self) -> RobotParameterState {
        self.store().borrow().snapshot()
    }

    /// Apply a user edit and schedule a recompute. Must run inside a
    /// `LocalSet` when auto-recompute is on.
    pub fn edit(&self, update: ParameterUpdate) -> RobotParameterState {
        let state = self.store().borrow_mut().set(update).clone();
        self.pipeline().notify_parameters_changed();
        state
    }

    /// First-render hook; see [`AutoLoader::on_render`].
    pub async fn bootstrap<P: PresetSource>(&self, presets: &P) -> AutoLoadOutcome {
        self.autoloader.on_render(true, presets, &self.transactions).await
    }
}
