// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource-group binding over the unified (v2) controller hierarchy.
//!
//! Every controller file is line-oriented plain text, written one call at
//! a time; there are no transactional semantics to expose. Limit writes
//! are best effort because a partially limited workload is still useful.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use weaver_core::{GroupStats, ResourceLimits, SupervisorError, WorkloadId};

const PROCS_FILE: &str = "cgroup.procs";
const CONTROLLERS_FILE: &str = "cgroup.controllers";
const SUBTREE_CONTROL_FILE: &str = "cgroup.subtree_control";

/// Controllers delegated into the supervisor's subtree.
const WANTED_CONTROLLERS: [&str; 3] = ["memory", "cpu", "pids"];

/// Errors from controller filesystem manipulation.
#[derive(Debug, Error)]
pub enum CgroupError {
    /// The v2 hierarchy is missing or unusable at the configured root.
    #[error("cgroup v2 unavailable: {0}")]
    Unavailable(String),

    #[error("group already exists: {0}")]
    AlreadyExists(String),

    #[error("group not found: {0}")]
    NotFound(String),

    /// The group directory is non-empty: a live pid is still attached.
    #[error("group busy: {0}")]
    Busy(String),

    #[error("cgroup io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<CgroupError> for SupervisorError {
    fn from(err: CgroupError) -> Self {
        match err {
            CgroupError::Unavailable(msg) => SupervisorError::ControllerUnavailable(msg),
            CgroupError::AlreadyExists(msg) => SupervisorError::AlreadyExists(msg),
            CgroupError::NotFound(msg) => SupervisorError::NotFound(msg),
            CgroupError::Busy(msg) => SupervisorError::Io(io::Error::other(msg)),
            CgroupError::Io { path, source } => {
                if source.kind() == io::ErrorKind::PermissionDenied {
                    SupervisorError::PermissionDenied(format!("{}: {}", path.display(), source))
                } else {
                    let kind = source.kind();
                    SupervisorError::Io(io::Error::new(
                        kind,
                        format!("{}: {}", path.display(), source),
                    ))
                }
            }
        }
    }
}

/// Probe whether the unified hierarchy is usable at `root`.
///
/// A v2 mount is recognized by its `cgroup.controllers` descriptor; a v1
/// mount point or an absent directory both fail the probe.
pub fn ensure_available(root: &Path) -> Result<(), CgroupError> {
    if !root.is_dir() {
        return Err(CgroupError::Unavailable(format!("{} is not a directory", root.display())));
    }
    let controllers = root.join(CONTROLLERS_FILE);
    if !controllers.is_file() {
        return Err(CgroupError::Unavailable(format!(
            "{} does not expose {}",
            root.display(),
            CONTROLLERS_FILE
        )));
    }
    Ok(())
}

/// Seam between the lifecycle engine and the controller filesystem.
///
/// [`CgroupBinding`] is the real implementation; tests substitute a
/// double to drive failure paths a writable hierarchy cannot produce on
/// demand.
pub trait Binding: Send + Sync + 'static {
    /// Create the group directory for a workload.
    fn create(&self, id: &WorkloadId) -> Result<(), CgroupError>;

    /// Remove a workload's group directory.
    ///
    /// The kernel refuses to remove a group with attached pids or child
    /// groups; that surfaces as [`CgroupError::Busy`].
    fn remove(&self, id: &WorkloadId) -> Result<(), CgroupError>;

    /// Write the set limits into the group's controller files.
    ///
    /// Unset fields are skipped. Each file is written independently and a
    /// failure is demoted to a warning: the caller has already committed
    /// to starting the workload, and partial limits still confine it.
    fn apply(&self, id: &WorkloadId, limits: &ResourceLimits);

    /// Attach a pid to the group.
    ///
    /// Unlike `apply`, a failure here is fatal for the caller: a child
    /// outside its group is unconfined and must be terminated.
    fn attach(&self, id: &WorkloadId, pid: u32) -> Result<(), CgroupError>;

    /// Read the group's usage counters.
    ///
    /// Missing files yield zero fields, not errors; the group may be
    /// transitional when sampled.
    fn stats(&self, id: &WorkloadId) -> GroupStats;
}

/// Handle to the supervisor's own subtree of the controller hierarchy.
///
/// All group directories live directly under `<root>/<prefix>`; the name
/// of each group is its workload id. Dropping the binding does NOT remove
/// the prefix directory: residue may belong to other instances, and
/// cleaning the root is an operator concern.
#[derive(Debug)]
pub struct CgroupBinding {
    base: PathBuf,
}

impl CgroupBinding {
    /// Validate availability, create `<root>/<prefix>`, and delegate the
    /// memory/cpu/pids controllers into the subtree.
    ///
    /// Idempotent: an existing directory is reused and already-enabled
    /// controllers are a no-op. Delegation failures are warnings, not
    /// fatal, matching the controller's own partial-enable semantics.
    pub fn init(root: &Path, prefix: &str) -> Result<Self, CgroupError> {
        ensure_available(root)?;

        let base = root.join(prefix);
        match fs::create_dir(&base) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(source) => return Err(CgroupError::Io { path: base, source }),
        }

        enable_controllers(root);
        enable_controllers(&base);

        info!(base = %base.display(), "controller binding initialized");
        Ok(Self { base })
    }

    /// The supervisor's subtree root, `<root>/<prefix>`.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory of one workload's group.
    pub fn group_path(&self, id: &WorkloadId) -> PathBuf {
        self.base.join(id.as_str())
    }
}

impl Binding for CgroupBinding {
    fn create(&self, id: &WorkloadId) -> Result<(), CgroupError> {
        let path = self.group_path(id);
        match fs::create_dir(&path) {
            Ok(()) => {
                debug!(group = %id, "created group");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(CgroupError::AlreadyExists(id.to_string()))
            }
            Err(source) => Err(CgroupError::Io { path, source }),
        }
    }

    fn remove(&self, id: &WorkloadId) -> Result<(), CgroupError> {
        let path = self.group_path(id);
        if !path.exists() {
            return Err(CgroupError::NotFound(id.to_string()));
        }
        match fs::remove_dir(&path) {
            Ok(()) => {
                debug!(group = %id, "removed group");
                Ok(())
            }
            Err(e)
                if e.kind() == io::ErrorKind::DirectoryNotEmpty
                    || e.kind() == io::ErrorKind::ResourceBusy =>
            {
                Err(CgroupError::Busy(id.to_string()))
            }
            Err(source) => Err(CgroupError::Io { path, source }),
        }
    }

    fn apply(&self, id: &WorkloadId, limits: &ResourceLimits) {
        let group = self.group_path(id);

        if limits.memory_bytes > 0 {
            write_limit(&group.join("memory.max"), &limits.memory_bytes.to_string());
        }
        if let Some((quota, period)) = limits.cpu_effective() {
            write_limit(&group.join("cpu.max"), &format!("{} {}", quota, period));
        }
        if limits.pids_limit > 0 {
            write_limit(&group.join("pids.max"), &limits.pids_limit.to_string());
        }
        // cpu_shares has no v2 file and is intentionally not written.
    }

    fn attach(&self, id: &WorkloadId, pid: u32) -> Result<(), CgroupError> {
        let path = self.group_path(id).join(PROCS_FILE);
        fs::write(&path, pid.to_string()).map_err(|source| CgroupError::Io { path, source })?;
        debug!(group = %id, pid, "attached pid to group");
        Ok(())
    }

    fn stats(&self, id: &WorkloadId) -> GroupStats {
        let group = self.group_path(id);
        let mut stats = GroupStats {
            memory_current_bytes: read_counter(&group.join("memory.current")),
            memory_peak_bytes: read_counter(&group.join("memory.peak")),
            ..GroupStats::default()
        };
        if let Ok(text) = fs::read_to_string(group.join("cpu.stat")) {
            parse_cpu_stat(&text, &mut stats);
        }
        stats
    }
}

/// Enable the wanted controllers for children of `dir`.
///
/// Only controllers the directory actually advertises are requested, one
/// `+name` token per write; the kernel rejects batched writes that name an
/// unavailable controller.
fn enable_controllers(dir: &Path) {
    let controllers_path = dir.join(CONTROLLERS_FILE);
    let available = match fs::read_to_string(&controllers_path) {
        Ok(s) => s,
        Err(err) => {
            warn!(path = %controllers_path.display(), error = %err, "cannot read controllers");
            return;
        }
    };

    let subtree = dir.join(SUBTREE_CONTROL_FILE);
    for name in WANTED_CONTROLLERS {
        if !available.split_whitespace().any(|c| c == name) {
            warn!(controller = name, dir = %dir.display(), "controller not available");
            continue;
        }
        if let Err(err) = fs::write(&subtree, format!("+{}", name)) {
            warn!(controller = name, dir = %dir.display(), error = %err, "failed to enable controller");
        }
    }
}

fn write_limit(path: &Path, value: &str) {
    if let Err(err) = fs::write(path, value) {
        warn!(path = %path.display(), value, error = %err, "failed to write limit");
    }
}

/// Read a single-value counter file, zero when absent or malformed.
fn read_counter(path: &Path) -> u64 {
    fs::read_to_string(path).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

/// Parse `cpu.stat` key-value lines into the stats fields we track.
fn parse_cpu_stat(text: &str, stats: &mut GroupStats) {
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(value) = value.parse() else {
            continue;
        };
        match key {
            "usage_usec" => stats.cpu_usage_usec = value,
            "nr_periods" => stats.nr_periods = value,
            "nr_throttled" => stats.nr_throttled = value,
            "throttled_usec" => stats.throttled_usec = value,
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "cgroup_tests.rs"]
mod tests;
