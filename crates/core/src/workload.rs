// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workload specs, lifecycle states, and registry records

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SupervisorError;
use crate::id::WorkloadId;
use crate::limits::ResourceLimits;

/// Maximum number of argv tokens in a workload command line.
pub const MAX_COMMAND_TOKENS: usize = 63;

/// Maximum byte length of a single command token.
pub const MAX_TOKEN_LEN: usize = 4096;

/// Input to `start`: everything needed to launch one workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub id: WorkloadId,
    /// Display name for listings; not required to be unique.
    pub name: String,
    /// Space-separated command line.
    ///
    /// Split on whitespace only. Quoting and escapes are not supported,
    /// and the command is never run through a shell.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Uid to run as; 0 inherits the supervisor's uid.
    #[serde(default)]
    pub uid: u32,
    /// Gid to run as; 0 inherits the supervisor's gid.
    #[serde(default)]
    pub gid: u32,
    #[serde(default)]
    pub limits: ResourceLimits,
}

impl WorkloadSpec {
    /// Reject malformed specs before any side effect.
    ///
    /// The id is validated by construction; this checks the command shape.
    pub fn validate(&self) -> Result<(), SupervisorError> {
        tokenize_command(&self.command).map(|_| ())
    }
}

/// Split a command line into argv tokens.
///
/// Whitespace-separated, no quoting. A quoted argument with spaces cannot
/// be expressed; callers needing one must wrap the command themselves.
pub fn tokenize_command(command: &str) -> Result<Vec<String>, SupervisorError> {
    let tokens: Vec<String> = command.split_whitespace().map(str::to_string).collect();

    if tokens.is_empty() {
        return Err(SupervisorError::InvalidArgument("command must not be empty".into()));
    }
    if tokens.len() > MAX_COMMAND_TOKENS {
        return Err(SupervisorError::InvalidArgument(format!(
            "command exceeds {} tokens ({})",
            MAX_COMMAND_TOKENS,
            tokens.len()
        )));
    }
    if let Some(long) = tokens.iter().find(|t| t.len() > MAX_TOKEN_LEN) {
        return Err(SupervisorError::InvalidArgument(format!(
            "command token exceeds {} bytes: {:.32}...",
            MAX_TOKEN_LEN, long
        )));
    }

    Ok(tokens)
}

/// Lifecycle state of a workload.
///
/// `Init` and `Stopping` are transient; the rest are terminal for the
/// record's own process. State only advances along the lifecycle edges;
/// a terminal record never becomes live again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadState {
    /// Record reserved, process not yet forked.
    Init,
    Running,
    /// Stop requested; SIGTERM sent, grace window open.
    Stopping,
    /// Graceful-stop terminal state, kept for protocol parity.
    Stopped,
    /// Process exited normally (or was reaped elsewhere).
    Terminated,
    /// Abnormal exit: killed by an unexpected signal, or never launched.
    Failed,
}

impl WorkloadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkloadState::Stopped | WorkloadState::Terminated | WorkloadState::Failed)
    }

    /// Running or Stopping: a live process the reaper must track.
    pub fn is_live(self) -> bool {
        matches!(self, WorkloadState::Running | WorkloadState::Stopping)
    }
}

impl std::fmt::Display for WorkloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkloadState::Init => "init",
            WorkloadState::Running => "running",
            WorkloadState::Stopping => "stopping",
            WorkloadState::Stopped => "stopped",
            WorkloadState::Terminated => "terminated",
            WorkloadState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// How a workload's process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExitStatus {
    /// Normal exit with this code.
    Code(i32),
    /// Killed by this signal.
    Signal(i32),
}

/// Registry entry for one workload.
///
/// `spec` is immutable after creation. The tail (`limits` onward) is
/// mutated by the lifecycle engine and the reaper, always under the
/// owning per-record lock.
#[derive(Debug, Clone)]
pub struct WorkloadRecord {
    pub spec: WorkloadSpec,
    /// Limits currently applied to the resource group; diverges from
    /// `spec.limits` after a clamp or a successful update.
    pub limits: ResourceLimits,
    /// OS pid; 0 until the fork succeeds.
    pub os_pid: i32,
    /// Wall-clock start time; 0 until the fork succeeds.
    pub started_at_ms: u64,
    pub state: WorkloadState,
    pub last_exit: Option<ExitStatus>,
}

impl WorkloadRecord {
    pub fn new(spec: WorkloadSpec, limits: ResourceLimits) -> Self {
        Self {
            spec,
            limits,
            os_pid: 0,
            started_at_ms: 0,
            state: WorkloadState::Init,
            last_exit: None,
        }
    }

    /// Point-in-time copy, safe to hold without any lock.
    pub fn snapshot(&self) -> WorkloadSnapshot {
        WorkloadSnapshot {
            spec: self.spec.clone(),
            limits: self.limits,
            os_pid: self.os_pid,
            started_at_ms: self.started_at_ms,
            state: self.state,
            last_exit: self.last_exit,
        }
    }
}

/// Copy of a record returned by get/list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSnapshot {
    pub spec: WorkloadSpec,
    pub limits: ResourceLimits,
    pub os_pid: i32,
    pub started_at_ms: u64,
    pub state: WorkloadState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exit: Option<ExitStatus>,
}

#[cfg(test)]
#[path = "workload_tests.rs"]
mod tests;
