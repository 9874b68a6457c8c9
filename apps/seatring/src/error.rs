//! CLI error handling

use std::fmt;

use seatring_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Error raised by configuration loading, the table run or rendering
    App(seatring_errors::Error),
}

impl CliError {
    /// Whether the run was stopped by an interrupt rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CliError::App(e) if e.is_cancelled())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::App(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::App(e) => Some(e),
        }
    }
}

impl From<seatring_errors::Error> for CliError {
    fn from(e: seatring_errors::Error) -> Self {
        CliError::App(e)
    }
}
