//! # Auto-Load
//!
//! One-shot bootstrap: the first time an initialized session renders with
//! nothing to show, fetch the default public preset, load it through the
//! transaction manager and solve it once.
//!
//! This is a convenience. Fetch or parse failures are logged and swallowed;
//! the user just keeps the blank default configuration.

use std::cell::Cell;

use crate::errors::RobotError;
use crate::pipeline::SubmitOutcome;
use crate::preset::{pick_default, PresetSource};
use crate::solver::Solver;
use crate::transaction::PresetTransactionManager;

/// What one `on_render` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoLoadOutcome {
    /// Initialization has not completed yet; try again on a later render
    NotReady,
    /// The latch is already set for this session
    AlreadyAttempted,
    /// Something is (or is about to be) on screen; the latch is set
    HasResult,
    /// The service listed no public presets
    NoPreset,
    /// A preset was loaded and submitted once
    Loaded { preset_id: i64, submit: SubmitOutcome },
    /// The attempt failed; not surfaced to the user
    Failed(RobotError),
}

/// Session-scoped auto-load latch.
#[derive(Debug, Default)]
pub struct AutoLoader {
    attempted: Cell<bool>,
}

impl AutoLoader {
    pub fn new() -> Self {
        AutoLoader::default()
    }

    pub fn attempted(&self) -> bool {
        self.attempted.get()
    }

    /// Render hook. Re-renders never re-arm the latch.
    pub async fn on_render<S, P>(
        &self,
        initialized: bool,
        presets: &P,
        transactions: &PresetTransactionManager<S>,
    ) -> AutoLoadOutcome
    where
        S: Solver,
        P: PresetSource,
    {
        if !initialized {
            return AutoLoadOutcome::NotReady;
        }
        if self.attempted.get() {
            return AutoLoadOutcome::AlreadyAttempted;
        }

        let pipeline = transactions.pipeline();
        self.attempted.set(true);
        if !pipeline.snapshot().is_empty() || transactions.is_loading() {
            return AutoLoadOutcome::HasResult;
        }

        let listed = match presets.list_public_presets().await {
            Ok(listed) => listed,
            Err(e) => return swallow(e),
        };
        let Some(preset) = pick_default(&listed) else {
            log::info!("Auto-load skipped: no public presets");
            return AutoLoadOutcome::NoPreset;
        };

        let defaults = pipeline.store().borrow().defaults().clone();
        let state = match preset.to_state(&defaults) {
            Ok(state) => state,
            Err(e) => return swallow(e),
        };
        log::info!("Auto-loading preset '{}' ({})", preset.name, preset.id);
        if let Err(e) = transactions.load(state).await {
            return swallow(e);
        }

        AutoLoadOutcome::Loaded {
            preset_id: preset.id,
            submit: pipeline.submit().await,
        }
    }
}

fn swallow(error: RobotError) -> AutoLoadOutcome {
    log::info!("Auto-load failed, keeping defaults: {}", error);
    AutoLoadOutcome::Failed(error)
}
