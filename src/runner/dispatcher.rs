use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::types::TimeoutPolicy;
use crate::error::CodepadError;
use crate::language::Language;
use crate::runner::outcome::ExecutionOutcome;
use crate::runner::registry::BackendRegistry;
use crate::runner::ExecutionRequest;

/// Budget applied when the caller has no preference.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Routes each request to its backend, enforces the time budget, and turns
/// every result or failure into an [`ExecutionOutcome`].
///
/// Holds no per-run state; the registry it shares is read-only.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<BackendRegistry>,
    policy: TimeoutPolicy,
}

impl Dispatcher {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self::with_policy(registry, TimeoutPolicy::default())
    }

    pub fn with_policy(registry: Arc<BackendRegistry>, policy: TimeoutPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Execute one request.
    ///
    /// When the budget elapses first, the backend's future is dropped, which
    /// kills any worker process it owns and abandons any in-flight HTTP request.
    pub async fn execute(&self, request: ExecutionRequest, timeout_ms: u64) -> ExecutionOutcome {
        let language = request.language();
        let Some(backend) = self.registry.get(language) else {
            debug!(language = %language, "No backend registered");
            return ExecutionOutcome::from(CodepadError::UnsupportedLanguage {
                language: language.to_string(),
            });
        };

        if request.source().is_empty() {
            return ExecutionOutcome::from(CodepadError::EmptySource);
        }

        info!(
            language = %language,
            backend = backend.name(),
            source_len = request.source().len(),
            "Dispatching execution"
        );

        let run = backend.execute(request.source());
        let result = if self.policy.applies_to(language) {
            match tokio::time::timeout(Duration::from_millis(timeout_ms), run).await {
                Ok(result) => result,
                Err(_) => Err(CodepadError::Timeout { millis: timeout_ms }),
            }
        } else {
            run.await
        };

        let outcome = match result {
            Ok(output) => ExecutionOutcome::from(output),
            Err(e) => {
                debug!(language = %language, error = %e, "Execution failed");
                ExecutionOutcome::from(e)
            }
        };

        debug!(language = %language, success = outcome.is_success(), "Execution finished");
        outcome
    }

    /// Execute source under a user-facing language tag. Unknown tags produce a
    /// backend error outcome.
    pub async fn execute_tagged(&self, tag: &str, source: &str, timeout_ms: u64) -> ExecutionOutcome {
        match tag.parse::<Language>() {
            Ok(language) => {
                self.execute(ExecutionRequest::new(language, source), timeout_ms)
                    .await
            }
            Err(e) => ExecutionOutcome::from(e),
        }
    }
}
