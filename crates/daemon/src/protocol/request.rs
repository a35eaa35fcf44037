// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use weaver_core::{ResourceLimits, WorkloadSpec};

/// Request from the control plane to the node supervisor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check; answered with the daemon version
    Health,

    /// Launch a workload
    Start { spec: WorkloadSpec },

    /// Stop a workload gracefully, escalating after the grace window
    Stop { id: String },

    /// Snapshot one workload
    Get { id: String },

    /// Snapshot every workload
    List,

    /// Re-apply resource limits to a live workload
    UpdateLimits { id: String, limits: ResourceLimits },

    /// Read usage counters from a workload's group
    Stats { id: String },

    /// Daemon status: uptime, per-state counts, engine counters
    Status,

    /// Request daemon shutdown
    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
