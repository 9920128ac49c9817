//! Core identifier types for conflux.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process identifier - identifies one query execution.
///
/// Every `QueryProcessor` runs on behalf of exactly one process. The id is
/// carried through to data managers so that sub-requests can be correlated
/// with the query that issued them.
///
/// # Example
///
/// ```rust
/// use conflux_common::types::ProcessId;
///
/// let pid = ProcessId::new(42);
/// assert_eq!(pid.as_u64(), 42);
/// assert_eq!(pid.to_string(), "proc-42");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ProcessId(u64);

impl ProcessId {
    /// Creates a new `ProcessId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessId({})", self.0)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc-{}", self.0)
    }
}

impl From<u64> for ProcessId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Connection identifier - identifies the client session that issued a query.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

impl From<u64> for ConnectionId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Buffer identifier - the opaque handle naming a tuple buffer.
///
/// Buffer ids are allocated monotonically by a buffer manager and never
/// reused within its lifetime.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BufferId(u64);

impl BufferId {
    /// First id handed out by a buffer manager.
    pub const FIRST: Self = Self(1);

    /// Creates a new `BufferId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next buffer ID.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferId({})", self.0)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer-{}", self.0)
    }
}

impl From<u64> for BufferId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<BufferId> for u64 {
    #[inline]
    fn from(id: BufferId) -> Self {
        id.0
    }
}
