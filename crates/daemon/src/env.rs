// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Daemon version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve state directory: NW_STATE_DIR > XDG_STATE_HOME/weaverd > ~/.local/state/weaverd
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("NW_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("weaverd"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/weaverd"))
}

/// Mount point of the unified controller hierarchy.
pub fn controller_root() -> PathBuf {
    std::env::var("NW_CGROUP_ROOT").map(PathBuf::from).unwrap_or_else(|_| {
        PathBuf::from("/sys/fs/cgroup")
    })
}

/// Directory under the controller root that holds this instance's groups.
pub fn group_prefix() -> String {
    std::env::var("NW_GROUP_PREFIX").unwrap_or_else(|_| "nexus_weaver".to_string())
}

/// Reaper polling cadence (default 1s, via `NW_REAPER_INTERVAL_MS`).
pub fn reaper_interval() -> Duration {
    duration_ms("NW_REAPER_INTERVAL_MS", Duration::from_secs(1))
}

/// SIGTERM-to-SIGKILL grace window (default 2s, via `NW_STOP_GRACE_MS`).
pub fn stop_grace() -> Duration {
    duration_ms("NW_STOP_GRACE_MS", Duration::from_secs(2))
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    duration_ms("NW_IPC_TIMEOUT_MS", Duration::from_secs(5))
}

/// Log filter directive (default `info`, via `NW_LOG`).
pub fn log_filter() -> String {
    std::env::var("NW_LOG").unwrap_or_else(|_| "info".to_string())
}

fn duration_ms(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
