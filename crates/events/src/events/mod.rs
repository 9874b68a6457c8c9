use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventSource};
use seatring_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod general;
pub mod run;
pub mod worker;

pub use general::*;
pub use run::*;
pub use worker::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, debug output)
    General(GeneralEvent),

    /// Worker state-machine transitions
    Worker(WorkerEvent),

    /// Run lifecycle (start, completion, cancellation)
    Run(RunEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::General,
            Self::Worker(_) => EventSource::Worker,
            Self::Run(_) => EventSource::Run,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. })
            | Self::Worker(WorkerEvent::Failed { .. })
            | Self::Run(RunEvent::Failed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Worker(WorkerEvent::Cancelled { .. })
            | Self::Run(RunEvent::Cancelled { .. }) => Level::WARN,

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Worker(WorkerEvent::Seated { .. } | WorkerEvent::Unseated { .. }) => {
                Level::DEBUG
            }

            Self::Worker(WorkerEvent::PickedUp { .. } | WorkerEvent::PutDown { .. }) => {
                Level::TRACE
            }

            _ => Level::INFO,
        }
    }

    /// Metadata for this event with level and source derived from its domain
    #[must_use]
    pub fn default_meta(&self) -> crate::EventMeta {
        crate::EventMeta::new(EventLevel::from(self.log_level()), self.event_source())
    }
}
