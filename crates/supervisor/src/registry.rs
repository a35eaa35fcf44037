// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed store of live and recently terminated workloads.
//!
//! Two-tier locking: one registry mutex guards the map, one mutex per
//! record guards its mutable tail. The order is registry before record,
//! never the reverse, and the registry lock is held only for map walks —
//! never across controller I/O or a wait call.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use weaver_core::{SupervisorError, WorkloadId, WorkloadRecord, WorkloadSnapshot};

/// Shared handle to one registry entry.
///
/// A handle may outlive the registry lock that produced it; holders lock
/// the record itself for any read or write of the mutable tail.
pub type RecordHandle = Arc<Mutex<WorkloadRecord>>;

/// Registry of all known workloads, keyed by id.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<HashMap<WorkloadId, RecordHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record.
    ///
    /// A collision with a live record is an error. A terminated record
    /// with the same id is purged and replaced, so ids become reusable
    /// once their previous workload is done.
    pub fn insert(&self, record: WorkloadRecord) -> Result<RecordHandle, SupervisorError> {
        let id = record.spec.id;
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.get(id.as_str()) {
            if !existing.lock().state.is_terminal() {
                return Err(SupervisorError::AlreadyExists(id.to_string()));
            }
            // Purge-on-new-start: the terminated record has been inspectable
            // until now; reusing its id retires it.
        }

        let handle = Arc::new(Mutex::new(record));
        inner.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    pub fn lookup(&self, id: &str) -> Option<RecordHandle> {
        self.inner.lock().get(id).cloned()
    }

    /// Remove and drop a record.
    pub fn remove(&self, id: &str) -> Result<(), SupervisorError> {
        match self.inner.lock().remove(id) {
            Some(_) => Ok(()),
            None => Err(SupervisorError::NotFound(id.to_string())),
        }
    }

    /// Clone out every (id, handle) pair for a sweep.
    ///
    /// Callers lock each record only after this returns, keeping the
    /// registry lock out of any per-record critical section.
    pub fn handles(&self) -> Vec<(WorkloadId, RecordHandle)> {
        self.inner.lock().iter().map(|(id, handle)| (*id, Arc::clone(handle))).collect()
    }

    /// Point-in-time copies of every record.
    ///
    /// Each record is copied under its own lock, one at a time; ordering
    /// among records is unspecified and a concurrent start or stop may be
    /// missed or included, but no record is ever torn.
    pub fn snapshot(&self) -> Vec<WorkloadSnapshot> {
        self.handles().into_iter().map(|(_, handle)| handle.lock().snapshot()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
