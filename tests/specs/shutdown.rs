// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-wide shutdown retires every workload within the grace window.

use std::time::Duration;

use super::support::{fake_root, spec};
use weaver_supervisor::Supervisor;

#[tokio::test]
async fn shutdown_drives_all_records_terminal() {
    let (_root, config) = fake_root();
    let grace = config.stop_grace;
    let supervisor = Supervisor::new(config).unwrap();

    for id in ["s-1", "s-2", "s-3"] {
        supervisor.start(spec(id, "/bin/sleep 60")).unwrap();
    }

    let started = tokio::time::Instant::now();
    supervisor.shutdown().await;
    let elapsed = started.elapsed();

    for id in ["s-1", "s-2", "s-3"] {
        let snap = supervisor.get(id).unwrap();
        assert!(snap.state.is_terminal(), "{id} still {}", snap.state);
    }
    assert!(elapsed < grace + Duration::from_secs(1), "shutdown took {elapsed:?}");
}

#[tokio::test]
async fn shutdown_with_no_workloads_is_quick() {
    let (_root, config) = fake_root();
    let supervisor = Supervisor::new(config).unwrap();
    supervisor.shutdown().await;
    assert!(supervisor.list().is_empty());
}
