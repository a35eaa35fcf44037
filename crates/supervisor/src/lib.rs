// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! weaver-supervisor: the Nexus Weaver supervision engine
//!
//! Owns the per-workload resource groups, the process registry, the
//! launch/stop lifecycle, and the background reaper. The daemon crate
//! layers the socket transport on top of [`Supervisor`].

pub mod cgroup;
mod reaper;
pub mod registry;
mod spawn;
pub mod supervisor;

pub use cgroup::{ensure_available, Binding, CgroupBinding, CgroupError};
pub use registry::{RecordHandle, Registry};
pub use supervisor::{DaemonSupervisor, StateObserver, Supervisor, SupervisorConfig};
