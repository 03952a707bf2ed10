//! Optimistic-concurrency version stamps.

use serde::{Deserialize, Serialize};

/// Version number of a mutable record, used for optimistic concurrency
/// control.
///
/// Versions start at 1 when a record is created and increment by 1 on every
/// successful mutation. A writer states the version it read; if the stored
/// version has moved on, the write is rejected and the caller must re-read.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0), the state before a record exists.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1), assigned at creation.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}
