// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nexus Weaver daemon library
//!
//! Exposes the IPC protocol types for control-plane clients, plus the
//! lifecycle and listener plumbing used by the `weaverd` binary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod protocol;

pub use protocol::{Request, Response, StatusEntry, WorkloadEntry};
