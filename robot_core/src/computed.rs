//! # Computed Configuration and Pending Operations
//!
//! [`ComputedConfiguration`] is what the renderer draws. It is replaced as a
//! whole and never patched, so parameters and shape in one snapshot always
//! belong together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parameters::RobotParameterState;
use crate::solver::SolverResponse;

/// Immutable snapshot consumed by the renderer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ComputedConfiguration {
    /// Nothing to show (fresh session, or mid preset load)
    #[default]
    Empty,

    /// Parameters committed by a preset load, not solved yet
    Baseline {
        parameters: RobotParameterState,
    },

    /// Parameters together with the solver output computed from them
    Solved {
        parameters: RobotParameterState,
        shape: SolverResponse,
        computed_at: DateTime<Utc>,
    },
}

impl ComputedConfiguration {
    pub fn solved(parameters: RobotParameterState, shape: SolverResponse) -> Self {
        ComputedConfiguration::Solved {
            parameters,
            shape,
            computed_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ComputedConfiguration::Empty)
    }

    pub fn parameters(&self) -> Option<&RobotParameterState> {
        match self {
            ComputedConfiguration::Empty => None,
            ComputedConfiguration::Baseline { parameters } => Some(parameters),
            ComputedConfiguration::Solved { parameters, .. } => Some(parameters),
        }
    }

    pub fn shape(&self) -> Option<&SolverResponse> {
        match self {
            ComputedConfiguration::Solved { shape, .. } => Some(shape),
            _ => None,
        }
    }
}

/// Kind of asynchronous operation in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Compute,
    PresetLoad,
}

/// Marker for an operation that has started and not finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    pub id: Uuid,
    pub kind: OperationKind,
    pub started_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn start(kind: OperationKind) -> Self {
        PendingOperation {
            id: Uuid::new_v4(),
            kind,
            started_at: Utc::now(),
        }
    }
}
