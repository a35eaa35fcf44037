// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource limits and host-capacity clamping

use serde::{Deserialize, Serialize};

/// Resource envelope for one workload.
///
/// Zero means "unset" for every field. CPU throttling takes effect only
/// when both `cpu_quota_us` and `cpu_period_us` are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Memory ceiling in bytes.
    #[serde(default)]
    pub memory_bytes: u64,
    /// CPU quota in microseconds per period.
    #[serde(default)]
    pub cpu_quota_us: u64,
    /// CPU period in microseconds.
    #[serde(default)]
    pub cpu_period_us: u64,
    /// Relative CPU weight. Declared for protocol parity; the unified
    /// hierarchy has no shares file, so this is advisory and never written.
    #[serde(default)]
    pub cpu_shares: u32,
    /// Maximum number of tasks in the group.
    #[serde(default)]
    pub pids_limit: u64,
}

impl ResourceLimits {
    /// Quota/period pair, if both are set.
    pub fn cpu_effective(&self) -> Option<(u64, u64)> {
        (self.cpu_quota_us > 0 && self.cpu_period_us > 0)
            .then_some((self.cpu_quota_us, self.cpu_period_us))
    }

    /// Clamp limits that exceed what the host can provide.
    ///
    /// Returns a note per clamped field so the caller can log a warning.
    /// Clamping never fails: a start proceeds with the reduced envelope.
    pub fn clamp(&mut self, caps: &HostCaps) -> Vec<String> {
        let mut notes = Vec::new();

        if caps.memory_bytes > 0 && self.memory_bytes > caps.memory_bytes {
            notes.push(format!(
                "memory_bytes {} exceeds host memory {}; clamped",
                self.memory_bytes, caps.memory_bytes
            ));
            self.memory_bytes = caps.memory_bytes;
        }

        if let Some((quota, period)) = self.cpu_effective() {
            let ceiling = period.saturating_mul(caps.online_cpus);
            if caps.online_cpus > 0 && quota > ceiling {
                notes.push(format!(
                    "cpu_quota_us {} exceeds {} cpus x period {}; clamped",
                    quota, caps.online_cpus, period
                ));
                self.cpu_quota_us = ceiling;
            }
        }

        notes
    }
}

/// Host capacity consulted when clamping limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCaps {
    /// Total host memory in bytes; 0 when unknown (clamping is skipped).
    pub memory_bytes: u64,
    /// Online CPU count; 0 when unknown (clamping is skipped).
    pub online_cpus: u64,
}

impl HostCaps {
    /// Read host capacity from the running system.
    ///
    /// Unknown values come back as 0 rather than an error; limits are
    /// then passed through unclamped.
    pub fn detect() -> Self {
        Self { memory_bytes: detect_memory_bytes(), online_cpus: detect_online_cpus() }
    }
}

fn detect_memory_bytes() -> u64 {
    let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") else {
        return 0;
    };
    parse_mem_total_kb(&meminfo).saturating_mul(1024)
}

fn detect_online_cpus() -> u64 {
    std::thread::available_parallelism().map(|n| n.get() as u64).unwrap_or(0)
}

/// Parse the `MemTotal:` line of /proc/meminfo, in kB.
fn parse_mem_total_kb(meminfo: &str) -> u64 {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "limits_tests.rs"]
mod tests;
