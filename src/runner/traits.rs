use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::language::Language;
use crate::runner::ExecutionOutput;

/// Trait for language execution backends.
///
/// Every backend satisfies the same `execute(source) -> output` contract so the
/// dispatcher can treat in-process engines, worker processes, hosted
/// interpreters and remote services interchangeably.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the backend name (e.g., "script", "remote-compile")
    fn name(&self) -> &str;

    /// The language tag this backend serves
    fn language(&self) -> Language;

    /// Execute a snippet and return its captured output.
    ///
    /// Failures in user code are reported as errors, never as panics.
    async fn execute(&self, source: &str) -> Result<ExecutionOutput>;

    /// Wait up to `timeout` for the backend to become ready.
    /// Default implementation returns immediately.
    async fn wait_ready(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}
