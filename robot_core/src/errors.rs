//! # Error Types
//!
//! Structured error types for robot_core. Every error maps onto one of the
//! four user-facing kinds ([`ErrorKind`]) so the UI can present validation
//! problems, unreachable solvers and solver-side failures differently.
//!
//! ## Example
//!
//! ```rust
//! use robot_core::errors::{ErrorKind, RobotError, RobotResult};
//!
//! fn check_steps(steps: u32) -> RobotResult<()> {
//!     if steps == 0 {
//!         return Err(RobotError::validation("discretizationSteps", "Discretization steps must be positive"));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_steps(0).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Validation);
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for robot_core operations
pub type RobotResult<T> = Result<T, RobotError>;

/// The error taxonomy presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The validation gate rejected the configuration
    Validation,
    /// Solver unreachable or timed out
    Network,
    /// Solver answered with an error status
    Server,
    /// Anything else
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Network => "network",
            ErrorKind::Server => "server",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Failure reported by a solver collaborator.
///
/// Collaborators describe the *shape* of the failure; [`SolverError::kind`]
/// does the classification.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum SolverError {
    /// Explicit timeout signal from the transport
    #[error("Solver request timed out")]
    Timeout,

    /// No response at all (connection refused, DNS, reset)
    #[error("Solver unreachable: {reason}")]
    Unreachable { reason: String },

    /// The solver responded with a non-2xx status
    #[error("Solver returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// A 2xx response whose body could not be understood
    #[error("Malformed solver response: {reason}")]
    Malformed { reason: String },
}

impl SolverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SolverError::Timeout | SolverError::Unreachable { .. } => ErrorKind::Network,
            SolverError::Status { .. } => ErrorKind::Server,
            SolverError::Malformed { .. } => ErrorKind::Unknown,
        }
    }
}

/// Structured error type for robot_core operations.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum RobotError {
    /// The validation gate rejected a configuration
    #[error("{reason}")]
    Validation { field: String, reason: String },

    /// The solver call failed
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// The preset collaborator could not be reached or refused the request
    #[error("Preset service error: {operation} - {reason}")]
    PresetService { operation: String, reason: String },

    /// A preset was not found
    #[error("Preset not found: {preset_id}")]
    PresetNotFound { preset_id: i64 },

    /// A preset payload could not be turned into a configuration
    #[error("Malformed preset '{name}': {reason}")]
    MalformedPreset { name: String, reason: String },

    /// A second preset-load transaction was started mid-sequence
    #[error("A preset load is already in progress")]
    PresetLoadInProgress,

    /// Durable storage read/write failed
    #[error("Storage error: {operation} on '{key}' - {reason}")]
    Storage {
        operation: String,
        key: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RobotError {
    /// Create a Validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RobotError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a PresetService error
    pub fn preset_service(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        RobotError::PresetService {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a MalformedPreset error
    pub fn malformed_preset(name: impl Into<String>, reason: impl Into<String>) -> Self {
        RobotError::MalformedPreset {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a Storage error
    pub fn storage(operation: impl Into<String>, key: impl Into<String>, reason: impl Into<String>) -> Self {
        RobotError::Storage {
            operation: operation.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Which of the four user-facing kinds this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            RobotError::Validation { .. } => ErrorKind::Validation,
            RobotError::Solver(e) => e.kind(),
            RobotError::PresetService { .. } => ErrorKind::Network,
            _ => ErrorKind::Unknown,
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            RobotError::Validation { .. } => "VALIDATION",
            RobotError::Solver(SolverError::Timeout) => "SOLVER_TIMEOUT",
            RobotError::Solver(SolverError::Unreachable { .. }) => "SOLVER_UNREACHABLE",
            RobotError::Solver(SolverError::Status { .. }) => "SOLVER_STATUS",
            RobotError::Solver(SolverError::Malformed { .. }) => "SOLVER_MALFORMED",
            RobotError::PresetService { .. } => "PRESET_SERVICE",
            RobotError::PresetNotFound { .. } => "PRESET_NOT_FOUND",
            RobotError::MalformedPreset { .. } => "MALFORMED_PRESET",
            RobotError::PresetLoadInProgress => "PRESET_LOAD_IN_PROGRESS",
            RobotError::Storage { .. } => "STORAGE",
            RobotError::Serialization { .. } => "SERIALIZATION",
            RobotError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for RobotError {
    fn from(e: serde_json::Error) -> Self {
        RobotError::Serialization { reason: e.to_string() }
    }
}

/// An error as shown to the user: kind, message and when it was raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfacedError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl SurfacedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        SurfacedError {
            kind,
            message: message.into(),
            raised_at: Utc::now(),
        }
    }
}

impl From<&RobotError> for SurfacedError {
    fn from(error: &RobotError) -> Self {
        SurfacedError::new(error.kind(), error.to_string())
    }
}

impl fmt::Display for SurfacedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}
