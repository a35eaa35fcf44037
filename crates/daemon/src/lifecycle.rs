// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{info, warn};
use weaver_core::SupervisorError;
use weaver_supervisor::{DaemonSupervisor, Supervisor, SupervisorConfig};

use crate::env;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/weaverd)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Engine tuning passed through to the supervisor
    pub supervisor: SupervisorConfig,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Fixed file names under the state directory; one daemon per node.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;

        Ok(Self {
            socket_path: state_dir.join("weaverd.sock"),
            lock_path: state_dir.join("weaverd.pid"),
            log_path: state_dir.join("weaverd.log"),
            supervisor: SupervisorConfig {
                controller_root: env::controller_root(),
                group_prefix: env::group_prefix(),
                reaper_interval: env::reaper_interval(),
                stop_grace: env::stop_grace(),
            },
            state_dir,
        })
    }
}

/// Daemon state during operation.
///
/// The listener is returned separately from startup so the binary can
/// spawn it as its own task.
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// The supervision engine (shared with the listener)
    pub supervisor: Arc<DaemonSupervisor>,
    /// When the daemon started
    pub start_time: Instant,
    /// Signaled by the listener on a Shutdown request
    pub shutdown: Arc<Notify>,
}

impl std::fmt::Debug for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonState").field("config", &self.config).finish_non_exhaustive()
    }
}

impl DaemonState {
    /// Shutdown the daemon gracefully: retire every workload, then remove
    /// the socket and PID files.
    pub async fn shutdown(&self) {
        info!("shutting down daemon");

        self.supervisor.shutdown().await;

        if self.config.socket_path.exists() {
            if let Err(err) = std::fs::remove_file(&self.config.socket_path) {
                warn!(error = %err, "failed to remove socket file");
            }
        }
        if self.config.lock_path.exists() {
            if let Err(err) = std::fs::remove_file(&self.config.lock_path) {
                warn!(error = %err, "failed to remove PID file");
            }
        }
        // The file lock itself is released when lock_file drops.

        info!("daemon shutdown complete");
    }
}

/// Start the daemon: acquire the PID lock, bind the socket, and bring up
/// the supervision engine.
///
/// Any failure here is fatal; the process exits non-zero. A missing or
/// read-only controller hierarchy surfaces as
/// [`SupervisorError::ControllerUnavailable`].
pub async fn startup(config: Config) -> Result<(DaemonState, UnixListener), LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Acquire the lock file FIRST - prevents races with another instance.
    // Avoid truncating before the lock is held, which would wipe the
    // running daemon's PID.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // A stale socket from a crashed instance would fail the bind; the
    // lock above proves nobody is serving it.
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|err| LifecycleError::BindFailed(config.socket_path.clone(), err))?;

    let supervisor = Arc::new(Supervisor::new(config.supervisor.clone())?);

    info!(
        socket = %config.socket_path.display(),
        controller_root = %config.supervisor.controller_root.display(),
        "daemon started"
    );

    Ok((
        DaemonState {
            config,
            lock_file,
            supervisor,
            start_time: Instant::now(),
            shutdown: Arc::new(Notify::new()),
        },
        listener,
    ))
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
