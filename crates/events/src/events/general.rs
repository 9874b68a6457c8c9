use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Events outside the worker and run lifecycles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// Something the user should know about; the run continues
    Warning { message: String, context: String },

    /// A problem found after the fact, e.g. state left behind by a failed run
    Error { message: String, details: String },

    /// Debug logging with structured context
    DebugLog {
        message: String,
        context: HashMap<String, String>,
    },

    /// Configuration resolved and validated
    ConfigurationValidated { source: String },
}

impl GeneralEvent {
    pub fn warning(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: context.into(),
        }
    }

    pub fn error(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn debug_with_context(
        message: impl Into<String>,
        context: HashMap<String, String>,
    ) -> Self {
        Self::DebugLog {
            message: message.into(),
            context,
        }
    }
}
