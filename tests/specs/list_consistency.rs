// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listing never observes a torn record while starts are in flight.

use std::sync::Arc;
use std::time::Duration;

use super::support::{fake_root, spec};
use weaver_core::WorkloadState;
use weaver_supervisor::Supervisor;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn snapshots_are_internally_consistent_under_concurrent_starts() {
    let (_root, config) = fake_root();
    let supervisor = Arc::new(Supervisor::new(config).unwrap());

    let mut starters = Vec::new();
    for i in 0..10 {
        let supervisor = Arc::clone(&supervisor);
        starters.push(tokio::spawn(async move {
            supervisor.start(spec(&format!("wl-{i}"), "/bin/sleep 10")).unwrap();
        }));
    }

    // Interleave 100 listings with the starts above.
    for _ in 0..100 {
        for snap in supervisor.list() {
            match snap.state {
                // A reserved record has no pid yet.
                WorkloadState::Init => assert_eq!(snap.os_pid, 0, "torn record: {snap:?}"),
                // A live record always has one.
                WorkloadState::Running | WorkloadState::Stopping => {
                    assert!(snap.os_pid > 0, "torn record: {snap:?}")
                }
                _ => {}
            }
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    for starter in starters {
        starter.await.unwrap();
    }
    assert_eq!(supervisor.list().len(), 10);

    supervisor.shutdown().await;
}
