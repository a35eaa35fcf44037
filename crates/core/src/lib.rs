// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! weaver-core: shared types for the Nexus Weaver node supervisor

pub mod error;
pub mod id;
pub mod limits;
pub mod metrics;
pub mod workload;

pub use error::SupervisorError;
pub use id::{WorkloadId, ID_MAX_LEN};
pub use limits::{HostCaps, ResourceLimits};
pub use metrics::{CounterSnapshot, GroupStats};
pub use workload::{
    tokenize_command, ExitStatus, WorkloadRecord, WorkloadSnapshot, WorkloadSpec, WorkloadState,
    MAX_COMMAND_TOKENS, MAX_TOKEN_LEN,
};
