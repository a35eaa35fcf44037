// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counter and usage snapshots shared between the engine and the wire layer.

use serde::{Deserialize, Serialize};

/// Engine counters, captured for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Workloads that reached Running.
    pub started: u64,
    /// Starts that failed after validation (group, fork/exec, or attach).
    pub start_failures: u64,
    /// Stop requests accepted (including idempotent no-ops).
    pub stop_requests: u64,
    /// Stops that escalated to SIGKILL after the grace window.
    pub kills_escalated: u64,
    /// Children reaped with a normal exit.
    pub reaped_normal: u64,
    /// Children reaped after dying to a signal.
    pub reaped_signaled: u64,
}

/// Resource usage read from a workload's group.
///
/// Fields the controller has not populated read as zero, never as an error;
/// a group can be mid-setup or mid-teardown when sampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub memory_current_bytes: u64,
    pub memory_peak_bytes: u64,
    pub cpu_usage_usec: u64,
    pub nr_periods: u64,
    pub nr_throttled: u64,
    pub throttled_usec: u64,
}
