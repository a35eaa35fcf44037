// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workload identifiers

use crate::error::SupervisorError;

/// Maximum byte length for a workload id.
///
/// Ids double as resource-group directory names, so the cap mirrors the
/// common 63-byte label limit rather than the filesystem's.
pub const ID_MAX_LEN: usize = 63;

/// Caller-chosen workload identifier. Fixed-size inline buffer, `Copy`.
///
/// Unlike a generated id, a `WorkloadId` arrives from the control plane and
/// is validated on construction: non-empty, at most [`ID_MAX_LEN`] bytes,
/// no path separators or NUL, and not a dot-directory name.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WorkloadId {
    len: u8,
    buf: [u8; ID_MAX_LEN],
}

impl WorkloadId {
    /// Validate and build an id.
    pub fn parse(s: &str) -> Result<Self, SupervisorError> {
        if s.is_empty() {
            return Err(SupervisorError::InvalidArgument("workload id must not be empty".into()));
        }
        if s.len() > ID_MAX_LEN {
            return Err(SupervisorError::InvalidArgument(format!(
                "workload id exceeds {} bytes: {:?}",
                ID_MAX_LEN, s
            )));
        }
        if s.bytes().any(|b| b == b'/' || b == b'\\' || b == 0) {
            return Err(SupervisorError::InvalidArgument(format!(
                "workload id must not contain path separators: {:?}",
                s
            )));
        }
        if s == "." || s == ".." {
            return Err(SupervisorError::InvalidArgument(format!(
                "workload id must not be a dot directory: {:?}",
                s
            )));
        }

        let mut buf = [0u8; ID_MAX_LEN];
        buf[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self { len: s.len() as u8, buf })
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only constructed from a validated &str, always valid UTF-8.
        match std::str::from_utf8(&self.buf[..self.len as usize]) {
            Ok(s) => s,
            Err(_) => unreachable!("WorkloadId constructed from non-UTF-8"),
        }
    }
}

impl std::hash::Hash for WorkloadId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Hash only the active bytes so it matches str::hash,
        // which is required for Borrow<str> HashMap lookups.
        self.as_str().hash(state);
    }
}

impl std::str::FromStr for WorkloadId {
    type Err = SupervisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::borrow::Borrow<str> for WorkloadId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for WorkloadId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::ops::Deref for WorkloadId {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for WorkloadId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for WorkloadId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl std::fmt::Debug for WorkloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl serde::Serialize for WorkloadId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for WorkloadId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        WorkloadId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
