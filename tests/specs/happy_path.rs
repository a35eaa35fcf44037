// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start, inspect, stop: the straight-line path.

use std::time::Duration;

use super::support::{fake_root, spec, wait_for};
use weaver_core::{ResourceLimits, SupervisorError, WorkloadState};
use weaver_supervisor::Supervisor;

#[tokio::test]
async fn start_inspect_stop() {
    let (_root, config) = fake_root();
    let supervisor = Supervisor::new(config).unwrap();

    let mut spec = spec("a", "/bin/sleep 60");
    spec.limits.memory_bytes = 268_435_456;
    supervisor.start(spec).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let snap = supervisor.get("a").unwrap();
    assert_eq!(snap.state, WorkloadState::Running);
    assert!(snap.os_pid > 0);

    supervisor.stop("a").await.unwrap();
    assert!(
        wait_for(
            || supervisor.get("a").unwrap().state == WorkloadState::Terminated,
            Duration::from_secs(3)
        )
        .await,
        "workload did not terminate within 3s of stop"
    );

    supervisor.shutdown().await;
}

#[tokio::test]
async fn duplicate_start_is_already_exists() {
    let (_root, config) = fake_root();
    let supervisor = Supervisor::new(config).unwrap();

    supervisor.start(spec("c", "/bin/sleep 30")).unwrap();
    let err = supervisor.start(spec("c", "/bin/sleep 30")).unwrap_err();
    assert!(matches!(err, SupervisorError::AlreadyExists(_)));

    supervisor.shutdown().await;
}

#[tokio::test]
async fn limit_update_round_trips_to_the_group_file() {
    let (root, config) = fake_root();
    let supervisor = Supervisor::new(config).unwrap();

    let mut spec = spec("e", "/bin/sleep 30");
    spec.limits.memory_bytes = 64 * 1024 * 1024;
    supervisor.start(spec).unwrap();

    supervisor
        .update_limits(
            "e",
            ResourceLimits { memory_bytes: 128 * 1024 * 1024, ..Default::default() },
        )
        .unwrap();

    let memory_max = root.path().join("nw").join("e").join("memory.max");
    assert_eq!(std::fs::read_to_string(memory_max).unwrap(), "134217728");
    assert_eq!(supervisor.get("e").unwrap().limits.memory_bytes, 134_217_728);

    supervisor.shutdown().await;
}
