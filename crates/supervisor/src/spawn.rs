// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workload process launch.

use std::os::unix::process::CommandExt;
use std::process::Command;

use weaver_core::{tokenize_command, SupervisorError, WorkloadSpec};

/// Fork and exec a workload, returning the child's pid.
///
/// Identity is applied gid-first in the child (setting uid first would
/// drop the right to change groups), then the working directory, then
/// exec. The post-fork path is the runtime's async-signal-safe one; an
/// exec or setup failure in the child is reported back over its CLOEXEC
/// pipe and surfaces here as an error in the parent, so a half-configured
/// child is never observed.
pub(crate) fn spawn_workload(spec: &WorkloadSpec) -> Result<u32, SupervisorError> {
    let argv = tokenize_command(&spec.command)?;

    let mut command = Command::new(&argv[0]);
    command.args(&argv[1..]);

    if spec.gid != 0 {
        command.gid(spec.gid);
    }
    if spec.uid != 0 {
        command.uid(spec.uid);
    }
    if let Some(dir) = &spec.working_dir {
        command.current_dir(dir);
    }

    let child = command.spawn().map_err(|err| match err.kind() {
        std::io::ErrorKind::PermissionDenied => {
            SupervisorError::PermissionDenied(format!("exec {}: {}", argv[0], err))
        }
        _ => SupervisorError::ProcessFailed(format!("exec {}: {}", argv[0], err)),
    })?;

    // The Child handle is dropped without waiting: the reaper owns wait(2)
    // for every tracked pid.
    Ok(child.id())
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
