//! Drives the real `codepad worker` subcommand as the isolated context.
#![cfg(feature = "js")]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use codepad::runner::{
    Backend, BackendRegistry, Dispatcher, ExecutionOutcome, IsolatedContext, RenderMode,
    SandboxedBackend, WorkerCommand,
};

fn worker() -> WorkerCommand {
    WorkerCommand {
        program: PathBuf::from(env!("CARGO_BIN_EXE_codepad")),
        args: vec!["worker".to_string()],
    }
}

fn dispatcher(timeout: Duration) -> Dispatcher {
    let backend = SandboxedBackend::with_worker(worker(), timeout);
    Dispatcher::new(Arc::new(BackendRegistry::new([
        Arc::new(backend) as Arc<dyn Backend>
    ])))
}

#[tokio::test]
async fn test_console_output_is_relayed() {
    let outcome = dispatcher(Duration::from_secs(10))
        .execute_tagged("javascript", "console.log('hi')", 10_000)
        .await;
    assert_eq!(
        outcome,
        ExecutionOutcome::Output {
            text: "hi\n".to_string(),
            render: RenderMode::Text,
        }
    );
}

#[tokio::test]
async fn test_completion_value_without_console() {
    let outcome = dispatcher(Duration::from_secs(10))
        .execute_tagged("js", "1 + 2", 10_000)
        .await;
    assert_eq!(outcome.text(), Some("3"));
}

#[tokio::test]
async fn test_thrown_error_is_reported() {
    let outcome = dispatcher(Duration::from_secs(10))
        .execute_tagged("javascript", "throw new Error('boom')", 10_000)
        .await;
    match outcome {
        ExecutionOutcome::BackendError { message } => assert!(message.contains("boom")),
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_infinite_loop_is_stopped() {
    let started = Instant::now();
    let outcome = dispatcher(Duration::from_millis(500))
        .execute_tagged("javascript", "while (true) {}", 10_000)
        .await;
    assert_eq!(outcome, ExecutionOutcome::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_contexts_share_no_state() {
    let dispatcher = dispatcher(Duration::from_secs(10));
    dispatcher
        .execute_tagged("javascript", "globalThis.leak = 42", 10_000)
        .await;
    let outcome = dispatcher
        .execute_tagged("javascript", "console.log(typeof leak)", 10_000)
        .await;
    assert_eq!(outcome.text(), Some("undefined\n"));
}

#[tokio::test]
async fn test_isolated_context_lifecycle() {
    let mut context = IsolatedContext::spawn(&worker()).unwrap();
    context.post("console.log('a'); console.log('b')").await.unwrap();
    assert_eq!(context.receive().await.unwrap(), "a\nb\n");

    context.terminate().await;
    assert!(context.is_terminated());
    assert!(context.post("1").await.is_err());
}
