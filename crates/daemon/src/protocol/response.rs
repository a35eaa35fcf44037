// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use weaver_core::{GroupStats, SupervisorError};

use super::types::{StatusEntry, WorkloadEntry};

/// Response from the daemon to the control plane
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Request succeeded with no payload
    Ok,

    Health { version: String },

    Started { id: String },

    Workload { workload: WorkloadEntry },

    Workloads { workloads: Vec<WorkloadEntry> },

    Stats { stats: GroupStats },

    Status { status: StatusEntry },

    ShuttingDown,

    /// Request failed; `kind` is a stable machine-readable string
    Error { kind: String, message: String },
}

impl Response {
    /// Map an engine error onto the wire.
    pub fn error(err: &SupervisorError) -> Self {
        Response::Error { kind: err.kind().to_string(), message: err.to_string() }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
