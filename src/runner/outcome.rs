use std::fmt;

use serde::Serialize;

use crate::error::CodepadError;
use crate::runner::{ExecutionOutput, RenderMode};

/// Prefix for every failure shown to the user.
pub const ERROR_MARKER: &str = "❌ Error:";

/// Shown when a run completed but produced nothing printable.
pub const NO_OUTPUT: &str = "❌ No output received.";

/// Normalised result of an execution attempt. Exactly one variant is produced
/// per request, including on timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Output { text: String, render: RenderMode },
    TimedOut,
    BackendError { message: String },
    TransportError { message: String },
}

impl ExecutionOutcome {
    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::BackendError {
            message: message.into(),
        }
    }

    /// The payload text for `Output`, the message for errors, `None` for timeouts.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Output { text, .. } => Some(text),
            Self::BackendError { message } | Self::TransportError { message } => Some(message),
            Self::TimedOut => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Output { .. })
    }
}

impl From<ExecutionOutput> for ExecutionOutcome {
    fn from(output: ExecutionOutput) -> Self {
        Self::Output {
            text: output.text,
            render: output.render,
        }
    }
}

impl From<CodepadError> for ExecutionOutcome {
    fn from(err: CodepadError) -> Self {
        match err {
            CodepadError::Timeout { .. } => Self::TimedOut,
            CodepadError::UnsupportedLanguage { .. } => Self::backend_error("unsupported language"),
            e if e.is_transport() => Self::TransportError {
                message: e.to_string(),
            },
            e => Self::backend_error(e.to_string()),
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output { text, .. } => f.write_str(text),
            Self::TimedOut => write!(f, "{} execution stopped, possible infinite loop", ERROR_MARKER),
            Self::BackendError { message } => write!(f, "{} {}", ERROR_MARKER, message),
            Self::TransportError { message } => write!(f, "{} {}", ERROR_MARKER, message),
        }
    }
}
