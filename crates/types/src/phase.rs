//! Worker state machine phases

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a worker within its acquire/work/release cycle
///
/// A cycle walks the phases in declaration order from `Idle` to `Unseated`
/// and wraps back to `Idle`. `Done` is reachable from `Idle` only, once no
/// cycles remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPhase {
    Idle,
    Seated,
    HoldingFirst,
    HoldingBoth,
    Working,
    ReleasingFirst,
    ReleasingSecond,
    Unseated,
    Done,
}

impl WorkerPhase {
    /// Phase that follows this one inside a cycle
    ///
    /// `Idle` maps to `Seated`; the `Idle -> Done` exit is taken by the
    /// caller when the cycle budget is spent. `Done` has no successor.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Seated),
            Self::Seated => Some(Self::HoldingFirst),
            Self::HoldingFirst => Some(Self::HoldingBoth),
            Self::HoldingBoth => Some(Self::Working),
            Self::Working => Some(Self::ReleasingFirst),
            Self::ReleasingFirst => Some(Self::ReleasingSecond),
            Self::ReleasingSecond => Some(Self::Unseated),
            Self::Unseated => Some(Self::Idle),
            Self::Done => None,
        }
    }

    /// Whether `to` is a legal successor of this phase
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.next() == Some(to) || (self == Self::Idle && to == Self::Done)
    }

    /// Whether a worker in this phase holds a seat
    #[must_use]
    pub fn is_seated(self) -> bool {
        matches!(
            self,
            Self::Seated
                | Self::HoldingFirst
                | Self::HoldingBoth
                | Self::Working
                | Self::ReleasingFirst
                | Self::ReleasingSecond
        )
    }

    /// Number of resources a worker in this phase holds
    #[must_use]
    pub fn resources_held(self) -> usize {
        match self {
            Self::HoldingFirst | Self::ReleasingSecond => 1,
            Self::HoldingBoth | Self::Working | Self::ReleasingFirst => 2,
            _ => 0,
        }
    }
}

impl Default for WorkerPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Seated => "seated",
            Self::HoldingFirst => "holding_first",
            Self::HoldingBoth => "holding_both",
            Self::Working => "working",
            Self::ReleasingFirst => "releasing_first",
            Self::ReleasingSecond => "releasing_second",
            Self::Unseated => "unseated",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}
