//! # robot_core - Soft Robot Configuration State Machine
//!
//! `robot_core` holds the editable configuration of a segmented soft robot
//! and drives it to a solved shape: it keeps the parallel parameter arrays
//! consistent, validates before anything leaves the process, coalesces edits
//! into single solver calls and replaces the whole configuration atomically
//! when a preset is loaded.
//!
//! ## Design Philosophy
//!
//! - **Invariants in the store**: array lengths always match `segments`, after every edit
//! - **Collaborators as traits**: solver, preset service and storage are injected
//! - **Whole snapshots**: the renderer only ever sees complete `ComputedConfiguration`s
//! - **Single-threaded**: `Rc`/`Cell` on a tokio `LocalSet`, no locks
//!
//! ## Quick Start
//!
//! ```rust
//! use robot_core::{MemoryStorage, ParameterStore, ParameterUpdate, SessionConfig};
//!
//! let config = SessionConfig::default();
//! let mut store = ParameterStore::open(Box::new(MemoryStorage::new()), &config);
//!
//! let state = store.set(ParameterUpdate::new().segments(5));
//! assert_eq!(state.bending_angles.len(), 5);
//! assert_eq!(state.coupling_lengths.len(), 6);
//! ```
//!
//! ## Modules
//!
//! - [`arrays`] / [`tendon`] - length normalization helpers
//! - [`parameters`] / [`store`] - parameter state and the store that guards it
//! - [`validation`] - the gate in front of the solver
//! - [`pipeline`] - debounced single-flight solver submission
//! - [`transaction`] - atomic preset loads
//! - [`autoload`] - first-render bootstrap
//! - [`session`] - all of the above wired together
//! - [`errors`] - structured error types

pub mod arrays;
pub mod autoload;
pub mod computed;
pub mod config;
pub mod errors;
pub mod parameters;
pub mod pipeline;
pub mod preset;
pub mod session;
pub mod solver;
pub mod storage;
pub mod store;
pub mod tendon;
pub mod transaction;
pub mod units;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types at crate root for convenience
pub use computed::{ComputedConfiguration, PendingOperation};
pub use config::{ParameterDefaults, SessionConfig};
pub use errors::{ErrorKind, RobotError, RobotResult, SolverError, SurfacedError};
pub use parameters::{ParameterPayload, ParameterUpdate, RobotParameterState};
pub use pipeline::{ComputationPipeline, SubmitOutcome};
pub use preset::{Preset, PresetDraft, PresetPatch, PresetSource};
pub use session::Workbench;
pub use solver::{Solver, SolverRequest, SolverResponse};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{ParameterField, ParameterStore};
pub use transaction::PresetTransactionManager;
