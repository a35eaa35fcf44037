// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by the supervision engine and the daemon.

use thiserror::Error;

/// Errors surfaced to callers of the supervision engine.
///
/// Initialization errors are fatal to the daemon; per-request errors are
/// returned over the wire and never crash the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Malformed id or spec; rejected before any side effect.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("workload not found: {0}")]
    NotFound(String),

    /// Id collision in the registry, or group collision on the controller.
    #[error("workload already exists: {0}")]
    AlreadyExists(String),

    /// Insufficient privileges for controller writes or uid/gid changes.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The v2 hierarchy is missing or not writable at the configured root.
    #[error("controller unavailable: {0}")]
    ControllerUnavailable(String),

    /// Fork/exec failure, or the child could not be placed in its group.
    #[error("process failed: {0}")]
    ProcessFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation not valid in the record's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl SupervisorError {
    /// Stable machine-readable kind string for the wire protocol.
    pub fn kind(&self) -> &'static str {
        match self {
            SupervisorError::InvalidArgument(_) => "invalid_argument",
            SupervisorError::NotFound(_) => "not_found",
            SupervisorError::AlreadyExists(_) => "already_exists",
            SupervisorError::PermissionDenied(_) => "permission_denied",
            SupervisorError::ControllerUnavailable(_) => "controller_unavailable",
            SupervisorError::ProcessFailed(_) => "process_failed",
            SupervisorError::Io(_) => "io_error",
            SupervisorError::InvalidState(_) => "invalid_state",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
