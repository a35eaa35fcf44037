// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTO structs for the IPC protocol.

use serde::{Deserialize, Serialize};
use weaver_core::{CounterSnapshot, ExitStatus, ResourceLimits, WorkloadSnapshot, WorkloadState};

/// Wire form of one workload for get/list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkloadEntry {
    pub id: String,
    pub name: String,
    pub command: String,
    pub state: WorkloadState,
    /// OS pid; 0 while the record is still Init
    pub pid: i32,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exit: Option<ExitStatus>,
    pub limits: ResourceLimits,
}

impl From<&WorkloadSnapshot> for WorkloadEntry {
    fn from(snap: &WorkloadSnapshot) -> Self {
        WorkloadEntry {
            id: snap.spec.id.to_string(),
            name: snap.spec.name.clone(),
            command: snap.spec.command.clone(),
            state: snap.state,
            pid: snap.os_pid,
            started_at_ms: snap.started_at_ms,
            last_exit: snap.last_exit,
            limits: snap.limits,
        }
    }
}

/// Daemon status summary for `Status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusEntry {
    pub version: String,
    pub uptime_ms: u64,
    /// All records, terminal ones included
    pub workloads: usize,
    pub running: usize,
    pub stopping: usize,
    pub terminal: usize,
    pub counters: CounterSnapshot,
}
