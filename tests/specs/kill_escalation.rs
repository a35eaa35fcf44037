// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A workload that ignores SIGTERM is killed at the end of the grace
//! window and classified as Failed by the reaper.

use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use super::support::{fake_root, spec, wait_for};
use weaver_core::{ExitStatus, WorkloadState};
use weaver_supervisor::Supervisor;

#[tokio::test]
async fn sigterm_immune_workload_is_sigkilled() {
    let (root, config) = fake_root();
    let supervisor = Supervisor::new(config).unwrap();

    let script = root.path().join("ignore-term.sh");
    std::fs::write(&script, "#!/bin/sh\ntrap '' TERM\nsleep 600\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    supervisor.start(spec("b", script.to_str().unwrap())).unwrap();
    supervisor.stop_with_grace("b", Duration::from_millis(300)).await.unwrap();

    assert!(
        wait_for(
            || supervisor.get("b").unwrap().state == WorkloadState::Failed,
            Duration::from_secs(3)
        )
        .await,
        "SIGKILL escalation did not land"
    );
    // WIFSIGNALED with SIGKILL
    assert_eq!(supervisor.get("b").unwrap().last_exit, Some(ExitStatus::Signal(9)));
    assert_eq!(supervisor.counters().kills_escalated, 1);

    supervisor.shutdown().await;
}
