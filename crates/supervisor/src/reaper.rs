// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background reaper that harvests terminated children.
//!
//! A single task polls at a fixed cadence rather than handling SIGCHLD:
//! the supervisor owns all of its children, so a bounded poll gives the
//! same convergence without signal-handler re-entrancy against the
//! registry locks.

use std::sync::Arc;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use weaver_core::ExitStatus;

use crate::cgroup::Binding;
use crate::supervisor::Shared;

/// Running reaper task plus its cooperative-shutdown token.
pub(crate) struct ReaperHandle {
    token: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl ReaperHandle {
    /// Signal the task and wait for it to finish its current tick.
    pub(crate) async fn shutdown(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}

pub(crate) fn spawn<B: Binding>(shared: Arc<Shared<B>>, interval: Duration) -> ReaperHandle {
    let token = CancellationToken::new();
    let tick_token = token.clone();
    let task = tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tick_token.cancelled() => break,
                _ = tick.tick() => reap_once(&shared),
            }
        }
        debug!("reaper exited");
    });
    ReaperHandle { token, task }
}

/// One reaper pass: non-blocking wait on every live pid.
///
/// The (id, handle, pid) set is snapshotted first so that no registry or
/// record lock is held across a wait call.
pub(crate) fn reap_once<B: Binding>(shared: &Shared<B>) {
    let mut live = Vec::new();
    for (id, handle) in shared.registry.handles() {
        let (state, pid) = {
            let record = handle.lock();
            (record.state, record.os_pid)
        };
        if state.is_live() && pid > 0 {
            live.push((id, handle, pid));
        }
    }

    for (id, handle, pid) in live {
        match waitpid(Pid::from_raw(pid), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => {
                shared.finish(&id, &handle, Some(ExitStatus::Code(code)));
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                shared.finish(&id, &handle, Some(ExitStatus::Signal(signal as i32)));
            }
            // Still alive, or a stop/continue we did not ask to see.
            Ok(_) => {}
            Err(Errno::ECHILD) => {
                // Reaped elsewhere or never existed; the process is gone
                // either way.
                shared.finish(&id, &handle, None);
            }
            Err(err) => {
                warn!(workload = %id, pid, error = %err, "waitpid failed");
            }
        }
    }
}
