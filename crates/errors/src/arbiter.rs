//! Arbiter error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors raised by the resource arbiter.
///
/// Apart from [`ArbiterError::Cancelled`], every variant is a programming
/// error: the caller sequenced its arbiter calls incorrectly or the shared
/// state was found in an impossible configuration. None of them are expected
/// during a well-formed run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ArbiterError {
    #[error("table needs at least 2 resources, got {size}")]
    TableTooSmall { size: usize },

    #[error("worker {worker} out of range for a table of {size}")]
    WorkerOutOfRange { worker: usize, size: usize },

    #[error("resource {resource} out of range for a table of {size}")]
    ResourceOutOfRange { resource: usize, size: usize },

    #[error("worker {worker} already holds a seat")]
    AlreadySeated { worker: usize },

    #[error("worker {worker} already holds resource {resource}")]
    AlreadyHeld { worker: usize, resource: usize },

    #[error("seat permit for worker {worker} was issued by another arbiter")]
    ForeignSeat { worker: usize },

    #[error("{operation} cancelled while waiting")]
    Cancelled { operation: String },

    #[error("arbiter state lock poisoned")]
    LockPoisoned,

    #[error("arbiter invariant violated: {message}")]
    InvariantViolated { message: String },
}

impl ArbiterError {
    /// Whether this error reports a cancelled wait rather than a misuse.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl UserFacingError for ArbiterError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::TableTooSmall { .. } => Some("Use a table size of 2 or more."),
            Self::Cancelled { .. } => Some("The run was interrupted; start it again."),
            Self::LockPoisoned | Self::InvariantViolated { .. } => {
                Some("This is a bug in the arbiter; please report it with the log output.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::TableTooSmall { .. } => "arbiter.table_too_small",
            Self::WorkerOutOfRange { .. } => "arbiter.worker_out_of_range",
            Self::ResourceOutOfRange { .. } => "arbiter.resource_out_of_range",
            Self::AlreadySeated { .. } => "arbiter.already_seated",
            Self::AlreadyHeld { .. } => "arbiter.already_held",
            Self::ForeignSeat { .. } => "arbiter.foreign_seat",
            Self::Cancelled { .. } => "arbiter.cancelled",
            Self::LockPoisoned => "arbiter.lock_poisoned",
            Self::InvariantViolated { .. } => "arbiter.invariant_violated",
        };
        Some(code)
    }
}
