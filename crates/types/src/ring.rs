//! Identifiers for workers and resources on the ring

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a worker in `[0, N)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(usize);

impl WorkerId {
    /// Create a worker ID from its zero-based index
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Zero-based index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// One-based number used in human-readable output
    #[must_use]
    pub const fn number(self) -> usize {
        self.0 + 1
    }

    /// The worker's own resource, acquired first
    #[must_use]
    pub const fn left(self) -> ResourceId {
        ResourceId(self.0)
    }

    /// The neighbor's resource `(id + 1) mod size`, acquired second
    ///
    /// `size` must be non-zero.
    #[must_use]
    pub const fn right(self, size: usize) -> ResourceId {
        ResourceId((self.0 + 1) % size)
    }

    /// Resource on the given side of this worker
    #[must_use]
    pub const fn resource(self, side: Side, size: usize) -> ResourceId {
        match side {
            Side::Left => self.left(),
            Side::Right => self.right(size),
        }
    }

    /// All worker IDs of a table of `size`
    pub fn all(size: usize) -> impl Iterator<Item = Self> {
        (0..size).map(Self)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl From<usize> for WorkerId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Index of a resource in `[0, N)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(usize);

impl ResourceId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ResourceId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Which of a worker's two resources is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The worker's own resource
    Left,
    /// The neighbor's resource
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}
