//! Table run error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors raised by the run driver while supervising worker tasks.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum RunError {
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("worker {worker} failed: {message}")]
    WorkerFailed { worker: usize, message: String },

    #[error("failed to join worker task: {message}")]
    JoinFailed { message: String },
}

impl UserFacingError for RunError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::WorkerPanicked { .. } => Some("Rerun with --debug to capture the panic."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::WorkerPanicked { .. } => "run.worker_panicked",
            Self::WorkerFailed { .. } => "run.worker_failed",
            Self::JoinFailed { .. } => "run.join_failed",
        };
        Some(code)
    }
}
