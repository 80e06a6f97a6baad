use async_trait::async_trait;
use boa_engine::Context;
use tokio::sync::oneshot;
use tracing::debug;

use crate::config::types::ScriptConfig;
use crate::error::{CodepadError, Result};
use crate::language::Language;
use crate::runner::capture::OutputCapture;
use crate::runner::traits::Backend;
use crate::runner::{ExecutionOutput, NO_OUTPUT};

/// Evaluate JavaScript in a fresh engine context and return what it printed.
///
/// Console output wins; otherwise the completion value's string form; otherwise
/// the no-output marker. Shared by the in-process backend and the worker.
pub fn evaluate_script(source: &str, loop_iteration_limit: Option<u64>) -> Result<String> {
    let mut context = Context::default();
    if let Some(limit) = loop_iteration_limit {
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(limit);
    }

    let mut capture = OutputCapture::install(&mut context)?;
    let completion = capture
        .eval(source)
        .map_err(|e| CodepadError::Evaluation(e.to_string()))?;

    let value_text = if completion.is_undefined() || completion.is_null() {
        String::new()
    } else {
        completion
            .to_string(capture.context())
            .map(|s| s.to_std_string_escaped())
            .unwrap_or_default()
    };

    let captured = capture.finish()?;

    Ok(if !captured.is_empty() {
        captured
    } else if !value_text.is_empty() {
        value_text
    } else {
        NO_OUTPUT.to_string()
    })
}

/// In-process JavaScript backend.
///
/// User code runs with the full privileges of this process. Each run gets its
/// own OS thread so the dispatcher can stop waiting on it; a runaway thread is
/// abandoned, not killed, and only the loop-iteration limit (if configured)
/// ever stops it.
pub struct ScriptBackend {
    loop_iteration_limit: Option<u64>,
}

impl ScriptBackend {
    pub fn new(config: ScriptConfig) -> Self {
        Self {
            loop_iteration_limit: config.loop_iteration_limit,
        }
    }
}

#[async_trait]
impl Backend for ScriptBackend {
    fn name(&self) -> &str {
        "script"
    }

    fn language(&self) -> Language {
        Language::Script
    }

    async fn execute(&self, source: &str) -> Result<ExecutionOutput> {
        debug!(source_len = source.len(), "Evaluating script in-process");

        let (tx, rx) = oneshot::channel();
        let source = source.to_string();
        let limit = self.loop_iteration_limit;

        std::thread::Builder::new()
            .name("codepad-script".to_string())
            .spawn(move || {
                let _ = tx.send(evaluate_script(&source, limit));
            })?;

        let text = rx.await.map_err(|_| {
            CodepadError::Evaluation("script evaluation thread exited without a result".to_string())
        })??;

        Ok(ExecutionOutput::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_output() {
        assert_eq!(evaluate_script("console.log('x')", None).unwrap(), "x\n");
    }

    #[test]
    fn test_console_joins_arguments() {
        assert_eq!(
            evaluate_script("console.log('a', 1, true); console.log('b')", None).unwrap(),
            "a 1 true\nb\n"
        );
    }

    #[test]
    fn test_completion_value_when_nothing_printed() {
        assert_eq!(evaluate_script("1 + 2", None).unwrap(), "3");
    }

    #[test]
    fn test_no_output_marker() {
        assert_eq!(evaluate_script("var a = 1;", None).unwrap(), NO_OUTPUT);
        assert_eq!(evaluate_script("null", None).unwrap(), NO_OUTPUT);
    }

    #[test]
    fn test_evaluation_error() {
        match evaluate_script("undefinedFunction()", None) {
            Err(CodepadError::Evaluation(message)) => {
                assert!(message.contains("undefinedFunction"), "{}", message)
            }
            other => panic!("expected evaluation error, got {:?}", other),
        }
    }

    #[test]
    fn test_loop_iteration_limit() {
        assert!(matches!(
            evaluate_script("while (true) {}", Some(1_000)),
            Err(CodepadError::Evaluation(_))
        ));
    }

    #[tokio::test]
    async fn test_backend_is_idempotent() {
        let backend = ScriptBackend::new(ScriptConfig::default());
        let first = backend.execute("console.log('same')").await.unwrap();
        let second = backend.execute("console.log('same')").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.text, "same\n");
    }

    #[tokio::test]
    async fn test_runaway_script_times_out_through_dispatcher() {
        use std::sync::Arc;
        use std::time::{Duration, Instant};

        use crate::runner::{BackendRegistry, Dispatcher, ExecutionOutcome};

        // The limit only bounds how long the abandoned thread keeps spinning
        let backend = ScriptBackend::new(ScriptConfig {
            enabled: true,
            loop_iteration_limit: Some(100_000_000),
        });
        let dispatcher = Dispatcher::new(Arc::new(BackendRegistry::new([
            Arc::new(backend) as Arc<dyn Backend>
        ])));

        let started = Instant::now();
        let outcome = dispatcher
            .execute_tagged("script", "while (true) {}", 100)
            .await;
        assert_eq!(outcome, ExecutionOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
