// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenarios that need the kernel's controller semantics: run as root on
//! a host with a writable cgroup2 mount (`cargo test -- --ignored`).

use std::path::PathBuf;
use std::time::Duration;

use super::support::{spec, wait_for};
use weaver_core::WorkloadState;
use weaver_supervisor::{Supervisor, SupervisorConfig};

fn real_root_config() -> SupervisorConfig {
    SupervisorConfig {
        controller_root: PathBuf::from("/sys/fs/cgroup"),
        // Unique prefix per test process so parallel CI runs don't collide.
        group_prefix: format!("nw_test_{}", std::process::id()),
        reaper_interval: Duration::from_millis(100),
        stop_grace: Duration::from_secs(2),
    }
}

fn cleanup_prefix(config: &SupervisorConfig) {
    let _ = std::fs::remove_dir(config.controller_root.join(&config.group_prefix));
}

#[tokio::test]
#[ignore = "requires root and a writable cgroup2 hierarchy"]
async fn running_workload_is_confined_and_accounted() {
    let config = real_root_config();
    let supervisor = Supervisor::new(config.clone()).unwrap();

    let mut spec = spec("rc-a", "/bin/sleep 60");
    spec.limits.memory_bytes = 268_435_456;
    supervisor.start(spec).unwrap();

    let group = config.controller_root.join(&config.group_prefix).join("rc-a");
    assert!(group.is_dir(), "group directory missing while Running");

    // The kernel charges the sleeping child's pages to the group.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(supervisor.stats("rc-a").unwrap().memory_current_bytes > 0);

    supervisor.stop("rc-a").await.unwrap();
    assert!(
        wait_for(
            || supervisor.get("rc-a").unwrap().state == WorkloadState::Terminated,
            Duration::from_secs(3)
        )
        .await
    );
    // The reaper removed the group after the exit.
    assert!(!group.exists(), "group directory survived termination");

    supervisor.shutdown().await;
    cleanup_prefix(&config);
}

#[tokio::test]
#[ignore = "requires root and a writable cgroup2 hierarchy"]
async fn shutdown_removes_every_group_directory() {
    let config = real_root_config();
    let supervisor = Supervisor::new(config.clone()).unwrap();

    for id in ["rc-1", "rc-2", "rc-3"] {
        supervisor.start(spec(id, "/bin/sleep 60")).unwrap();
    }
    supervisor.shutdown().await;

    let base = config.controller_root.join(&config.group_prefix);
    for id in ["rc-1", "rc-2", "rc-3"] {
        let snap = supervisor.get(id).unwrap();
        assert!(snap.state.is_terminal());
        assert!(!base.join(id).exists(), "{id} group directory survived shutdown");
    }
    cleanup_prefix(&config);
}
