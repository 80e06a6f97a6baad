mod backends;
#[cfg(feature = "js")]
mod capture;
mod dispatcher;
mod outcome;
mod registry;
mod traits;

#[cfg(feature = "js")]
pub use backends::{evaluate_script, ScriptBackend};
pub use backends::{
    wrap_document, wrap_java, wrap_python, CompiledBackend, IsolatedContext, ManagedBackend,
    MarkupBackend, PythonRuntime, RemoteCompileJob, RunRequest, RunResponse, RuntimeState,
    SandboxedBackend, WorkerCommand,
};
#[cfg(feature = "js")]
pub use capture::OutputCapture;
pub use dispatcher::{Dispatcher, DEFAULT_TIMEOUT_MS};
pub use outcome::{ExecutionOutcome, ERROR_MARKER, NO_OUTPUT};
pub use registry::{available_backends, create_registry, BackendInfo, BackendRegistry};
pub use traits::Backend;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::language::Language;

/// One user-triggered run: a language tag and the source to execute.
///
/// Immutable once built; backends only ever read the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    language: Language,
    source: String,
}

impl ExecutionRequest {
    pub fn new(language: Language, source: impl Into<String>) -> Self {
        Self {
            language,
            source: source.into(),
        }
    }

    /// Build a request from a user-facing language tag such as `python` or `html`.
    pub fn parse(tag: &str, source: impl Into<String>) -> Result<Self> {
        Ok(Self::new(tag.parse()?, source))
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// How the caller should present a successful result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Text,
    Markup,
}

/// Result of a backend run that completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub text: String,
    pub render: RenderMode,
}

impl ExecutionOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            render: RenderMode::Text,
        }
    }

    /// Text output, substituting the no-output marker when nothing was produced.
    pub fn text_or_marker(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::text(NO_OUTPUT)
        } else {
            Self::text(text)
        }
    }

    pub fn markup(document: impl Into<String>) -> Self {
        Self {
            text: document.into(),
            render: RenderMode::Markup,
        }
    }
}
