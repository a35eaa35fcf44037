// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor facade: public operations and shutdown orchestration.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use weaver_core::{
    CounterSnapshot, ExitStatus, GroupStats, HostCaps, ResourceLimits, SupervisorError,
    WorkloadId, WorkloadRecord, WorkloadSnapshot, WorkloadSpec, WorkloadState,
};

use crate::cgroup::{Binding, CgroupBinding};
use crate::reaper::{self, ReaperHandle};
use crate::registry::{RecordHandle, Registry};
use crate::spawn::spawn_workload;

/// Poll step used while waiting for a stop to settle.
const STOP_POLL: Duration = Duration::from_millis(25);

/// Wall-clock stamp for `started_at_ms`.
fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Supervisor tuning knobs, fed from the daemon's configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Mount point of the unified controller hierarchy.
    pub controller_root: PathBuf,
    /// Directory under the root that holds all of this instance's groups.
    pub group_prefix: String,
    /// Reaper polling cadence.
    pub reaper_interval: Duration,
    /// SIGTERM-to-SIGKILL grace window for stop and shutdown.
    pub stop_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            controller_root: PathBuf::from("/sys/fs/cgroup"),
            group_prefix: "nexus_weaver".to_string(),
            reaper_interval: Duration::from_secs(1),
            stop_grace: Duration::from_secs(2),
        }
    }
}

/// Observer invoked once per state transition, outside any lock.
pub type StateObserver = Arc<dyn Fn(&WorkloadId, WorkloadState, WorkloadState) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Counters {
    pub started: AtomicU64,
    pub start_failures: AtomicU64,
    pub stop_requests: AtomicU64,
    pub kills_escalated: AtomicU64,
    pub reaped_normal: AtomicU64,
    pub reaped_signaled: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            started: self.started.load(Ordering::Relaxed),
            start_failures: self.start_failures.load(Ordering::Relaxed),
            stop_requests: self.stop_requests.load(Ordering::Relaxed),
            kills_escalated: self.kills_escalated.load(Ordering::Relaxed),
            reaped_normal: self.reaped_normal.load(Ordering::Relaxed),
            reaped_signaled: self.reaped_signaled.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the facade, the reaper task, and handlers.
pub(crate) struct Shared<B: Binding> {
    pub registry: Registry,
    pub binding: B,
    pub caps: HostCaps,
    pub observer: Mutex<Option<StateObserver>>,
    pub counters: Counters,
}

impl<B: Binding> Shared<B> {
    /// Fire the observer for a transition. Called under no lock.
    fn emit(&self, id: &WorkloadId, old: WorkloadState, new: WorkloadState) {
        if old == new {
            return;
        }
        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            observer(id, old, new);
        }
    }

    /// Retire a live record whose process is gone: set the terminal state,
    /// record the exit, remove the group, and publish the transition.
    ///
    /// `exit == None` means the process was reaped elsewhere (ECHILD) and
    /// no status is available. A SIGTERM death while the record is
    /// `Stopping` is the stop we asked for and counts as a graceful
    /// termination; any other signal is a failure. If the record already
    /// left the live states, another path won the race and this is a no-op.
    pub(crate) fn finish(&self, id: &WorkloadId, handle: &RecordHandle, exit: Option<ExitStatus>) {
        let sigterm = Signal::SIGTERM as i32;
        let applied = {
            let mut record = handle.lock();
            if !record.state.is_live() {
                None
            } else {
                let new = match exit {
                    None | Some(ExitStatus::Code(_)) => WorkloadState::Terminated,
                    Some(ExitStatus::Signal(sig))
                        if sig == sigterm && record.state == WorkloadState::Stopping =>
                    {
                        WorkloadState::Terminated
                    }
                    Some(ExitStatus::Signal(_)) => WorkloadState::Failed,
                };
                let old = record.state;
                record.state = new;
                record.last_exit = exit;
                Some((old, new, record.os_pid))
            }
        };
        let Some((old, new, pid)) = applied else {
            return;
        };

        match exit {
            Some(ExitStatus::Code(code)) => {
                self.counters.reaped_normal.fetch_add(1, Ordering::Relaxed);
                info!(workload = %id, pid, code, "workload exited");
            }
            Some(ExitStatus::Signal(signal)) => {
                self.counters.reaped_signaled.fetch_add(1, Ordering::Relaxed);
                warn!(workload = %id, pid, signal, "workload killed by signal");
            }
            None => {
                self.counters.reaped_normal.fetch_add(1, Ordering::Relaxed);
                info!(workload = %id, pid, "workload already reaped; marking terminated");
            }
        }

        if let Err(err) = self.binding.remove(id) {
            warn!(workload = %id, error = %err, "failed to remove group");
        }

        self.emit(id, old, new);
    }
}

/// The supervision engine.
///
/// One instance per node. All operations are safe to call concurrently;
/// start and stop for distinct ids run fully in parallel, and list never
/// returns a torn record.
pub struct Supervisor<B: Binding = CgroupBinding> {
    shared: Arc<Shared<B>>,
    config: SupervisorConfig,
    reaper: Mutex<Option<ReaperHandle>>,
}

impl<B: Binding> std::fmt::Debug for Supervisor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Supervisor over the real controller hierarchy, as the daemon runs it.
pub type DaemonSupervisor = Supervisor<CgroupBinding>;

impl Supervisor<CgroupBinding> {
    /// Initialize the controller binding and start the reaper task.
    ///
    /// Fails when the v2 hierarchy is unusable at the configured root;
    /// the daemon treats that as fatal.
    pub fn new(config: SupervisorConfig) -> Result<Self, SupervisorError> {
        let binding = CgroupBinding::init(&config.controller_root, &config.group_prefix)?;
        Ok(Self::with_binding(config, binding))
    }
}

impl<B: Binding> Supervisor<B> {
    /// Build the engine over an already-initialized binding and start the
    /// reaper task.
    ///
    /// This is the seam tests use to wire in a binding double and force
    /// controller failures a writable hierarchy cannot produce on demand.
    /// Must be called from within a tokio runtime (the reaper is spawned
    /// immediately).
    pub fn with_binding(config: SupervisorConfig, binding: B) -> Self {
        let shared = Arc::new(Shared {
            registry: Registry::new(),
            binding,
            caps: HostCaps::detect(),
            observer: Mutex::new(None),
            counters: Counters::default(),
        });
        let reaper = reaper::spawn(Arc::clone(&shared), config.reaper_interval);
        Self { shared, config, reaper: Mutex::new(Some(reaper)) }
    }

    /// Register the single state-transition observer.
    pub fn set_observer(&self, observer: StateObserver) {
        *self.shared.observer.lock() = Some(observer);
    }

    /// Launch a workload: reserve the record, prepare its group, fork and
    /// exec, then attach the child to the group.
    ///
    /// Limit-file failures are demoted to warnings (the workload starts
    /// unconfined rather than not at all); an attach failure is not, and
    /// the child is killed to keep every Running record confined.
    pub fn start(&self, spec: WorkloadSpec) -> Result<WorkloadId, SupervisorError> {
        spec.validate()?;
        let id = spec.id;

        let mut limits = spec.limits;
        for note in limits.clamp(&self.shared.caps) {
            warn!(workload = %id, "{}", note);
        }

        let handle = self.shared.registry.insert(WorkloadRecord::new(spec.clone(), limits))?;

        if let Err(err) = self.shared.binding.create(&id) {
            let _ = self.shared.registry.remove(&id);
            self.shared.counters.start_failures.fetch_add(1, Ordering::Relaxed);
            return Err(err.into());
        }

        self.shared.binding.apply(&id, &limits);

        let pid = match spawn_workload(&spec) {
            Ok(pid) => pid,
            Err(err) => {
                error!(workload = %id, error = %err, "spawn failed");
                self.fail_start(&id, &handle, None);
                return Err(err);
            }
        };

        let old = {
            let mut record = handle.lock();
            record.os_pid = pid as i32;
            record.started_at_ms = epoch_ms();
            let old = record.state;
            record.state = WorkloadState::Running;
            old
        };
        self.shared.emit(&id, old, WorkloadState::Running);

        if let Err(err) = self.shared.binding.attach(&id, pid) {
            // An unconfined child must not keep running. It is killed and
            // reaped right here because the record leaves the reaper's
            // view the moment it turns Failed.
            error!(workload = %id, pid, error = %err, "attach failed, killing child");
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
            let _ = waitpid(Pid::from_raw(pid as i32), None);
            self.fail_start(&id, &handle, Some(ExitStatus::Signal(Signal::SIGKILL as i32)));
            return Err(SupervisorError::ProcessFailed(format!(
                "workload {} could not be placed in its group",
                id
            )));
        }

        self.shared.counters.started.fetch_add(1, Ordering::Relaxed);
        info!(workload = %id, pid, command = %spec.command, "started workload");
        Ok(id)
    }

    /// Mark a failed launch and retire its group. The record is retained
    /// in the Failed state for inspection.
    fn fail_start(&self, id: &WorkloadId, handle: &RecordHandle, exit: Option<ExitStatus>) {
        let old = {
            let mut record = handle.lock();
            let old = record.state;
            record.state = WorkloadState::Failed;
            record.last_exit = exit;
            old
        };
        if let Err(err) = self.shared.binding.remove(id) {
            warn!(workload = %id, error = %err, "failed to remove group");
        }
        self.shared.counters.start_failures.fetch_add(1, Ordering::Relaxed);
        self.shared.emit(id, old, WorkloadState::Failed);
    }

    pub fn get(&self, id: &str) -> Result<WorkloadSnapshot, SupervisorError> {
        self.shared
            .registry
            .lookup(id)
            .map(|handle| handle.lock().snapshot())
            .ok_or_else(|| SupervisorError::NotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<WorkloadSnapshot> {
        self.shared.registry.snapshot()
    }

    /// Re-apply limits to a live workload and store the new envelope.
    pub fn update_limits(
        &self,
        id: &str,
        limits: ResourceLimits,
    ) -> Result<(), SupervisorError> {
        let handle = self
            .shared
            .registry
            .lookup(id)
            .ok_or_else(|| SupervisorError::NotFound(id.to_string()))?;

        let mut limits = limits;
        for note in limits.clamp(&self.shared.caps) {
            warn!(workload = id, "{}", note);
        }

        let mut record = handle.lock();
        if record.state.is_terminal() {
            return Err(SupervisorError::InvalidState(format!(
                "workload {} is {}",
                id, record.state
            )));
        }
        self.shared.binding.apply(&record.spec.id, &limits);
        record.limits = limits;
        Ok(())
    }

    /// Read usage counters from the workload's group.
    pub fn stats(&self, id: &str) -> Result<GroupStats, SupervisorError> {
        let handle = self
            .shared
            .registry
            .lookup(id)
            .ok_or_else(|| SupervisorError::NotFound(id.to_string()))?;
        let group_id = handle.lock().spec.id;
        Ok(self.shared.binding.stats(&group_id))
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.shared.counters.snapshot()
    }

    /// Stop a workload with the configured grace window.
    pub async fn stop(&self, id: &str) -> Result<(), SupervisorError> {
        self.stop_with_grace(id, self.config.stop_grace).await
    }

    /// Stop a workload: SIGTERM, wait up to `grace` for the reaper to
    /// observe the exit, then SIGKILL.
    ///
    /// Idempotent: a record that is not Running (including one already
    /// terminal) returns success untouched. The wait never blocks other
    /// records; it polls this record's state only.
    pub async fn stop_with_grace(&self, id: &str, grace: Duration) -> Result<(), SupervisorError> {
        let handle = self
            .shared
            .registry
            .lookup(id)
            .ok_or_else(|| SupervisorError::NotFound(id.to_string()))?;
        self.shared.counters.stop_requests.fetch_add(1, Ordering::Relaxed);

        let (wid, pid) = {
            let mut record = handle.lock();
            if record.state != WorkloadState::Running {
                debug!(workload = id, state = %record.state, "stop is a no-op");
                return Ok(());
            }
            record.state = WorkloadState::Stopping;
            (record.spec.id, record.os_pid)
        };
        self.shared.emit(&wid, WorkloadState::Running, WorkloadState::Stopping);

        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => info!(workload = %wid, pid, "sent SIGTERM"),
            Err(Errno::ESRCH) => {
                // Already gone; the reaper's ECHILD path settles the record.
                debug!(workload = %wid, pid, "process already gone");
            }
            Err(err) => warn!(workload = %wid, pid, error = %err, "SIGTERM failed"),
        }

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            if handle.lock().state != WorkloadState::Stopping {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(STOP_POLL).await;
        }

        if handle.lock().state == WorkloadState::Stopping {
            info!(workload = %wid, pid, "grace elapsed, escalating to SIGKILL");
            let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
            self.shared.counters.kills_escalated.fetch_add(1, Ordering::Relaxed);
        }
        // The reaper performs the terminal transition.
        Ok(())
    }

    /// TERM every Running workload, wait one shared grace window, KILL
    /// the survivors. Used by shutdown.
    pub async fn stop_all(&self, grace: Duration) {
        let mut targets = Vec::new();
        for (id, handle) in self.shared.registry.handles() {
            let pid = {
                let mut record = handle.lock();
                if record.state != WorkloadState::Running {
                    continue;
                }
                record.state = WorkloadState::Stopping;
                record.os_pid
            };
            self.shared.emit(&id, WorkloadState::Running, WorkloadState::Stopping);
            match kill(Pid::from_raw(pid), Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(err) => warn!(workload = %id, pid, error = %err, "SIGTERM failed"),
            }
            targets.push((id, handle, pid));
        }
        if targets.is_empty() {
            return;
        }
        info!(count = targets.len(), "stopping all workloads");

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            if targets.iter().all(|(_, handle, _)| handle.lock().state != WorkloadState::Stopping)
            {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(STOP_POLL).await;
        }

        for (id, handle, pid) in &targets {
            if handle.lock().state == WorkloadState::Stopping {
                info!(workload = %id, pid, "grace elapsed, escalating to SIGKILL");
                let _ = kill(Pid::from_raw(*pid), Signal::SIGKILL);
                self.shared.counters.kills_escalated.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Orderly teardown: stop the reaper, TERM/KILL sweep, then drain the
    /// survivors to terminal states.
    ///
    /// The supervisor's prefix directory is left in place; residue there
    /// may belong to other instances and cleaning the root is an operator
    /// concern.
    pub async fn shutdown(&self) {
        info!("supervisor shutting down");
        let reaper = self.reaper.lock().take();
        if let Some(handle) = reaper {
            handle.shutdown().await;
        }
        self.stop_all(self.config.stop_grace).await;
        self.drain();
        info!("supervisor shutdown complete");
    }

    /// Collect every remaining live child with a blocking wait.
    ///
    /// Runs only after the reaper has been stopped and the kill sweep has
    /// finished, so each wait is bounded by how fast SIGKILL lands.
    fn drain(&self) {
        for (id, handle) in self.shared.registry.handles() {
            let (state, pid) = {
                let record = handle.lock();
                (record.state, record.os_pid)
            };
            if !state.is_live() || pid <= 0 {
                continue;
            }
            match waitpid(Pid::from_raw(pid), None) {
                Ok(WaitStatus::Exited(_, code)) => {
                    self.shared.finish(&id, &handle, Some(ExitStatus::Code(code)));
                }
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    self.shared.finish(&id, &handle, Some(ExitStatus::Signal(signal as i32)));
                }
                Ok(_) | Err(Errno::ECHILD) => {
                    self.shared.finish(&id, &handle, None);
                }
                Err(err) => warn!(workload = %id, pid, error = %err, "drain wait failed"),
            }
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
