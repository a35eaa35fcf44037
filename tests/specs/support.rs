// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures: a tempdir-backed fake controller root and fast timings.

use std::time::Duration;

use tempfile::TempDir;
use weaver_core::{ResourceLimits, WorkloadId, WorkloadSpec};
use weaver_supervisor::SupervisorConfig;

/// A fake v2 root: a tempdir carrying a `cgroup.controllers` descriptor.
/// Limit files behave as ordinary files here; behaviors that need the
/// kernel's semantics live in the ignored root-only tests.
pub fn fake_root() -> (TempDir, SupervisorConfig) {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("cgroup.controllers"), "cpuset cpu io memory pids\n")
        .unwrap();
    let config = SupervisorConfig {
        controller_root: root.path().to_path_buf(),
        group_prefix: "nw".to_string(),
        reaper_interval: Duration::from_millis(50),
        stop_grace: Duration::from_millis(400),
    };
    (root, config)
}

pub fn spec(id: &str, command: &str) -> WorkloadSpec {
    WorkloadSpec {
        id: WorkloadId::parse(id).unwrap(),
        name: id.to_string(),
        command: command.to_string(),
        working_dir: None,
        uid: 0,
        gid: 0,
        limits: ResourceLimits::default(),
    }
}

pub async fn wait_for(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
