use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::config::types::SandboxedConfig;
use crate::error::{CodepadError, Result};
use crate::language::Language;
use crate::runner::traits::Backend;
use crate::runner::ExecutionOutput;
use crate::worker::{WorkerReply, WorkerRequest};

/// Program and arguments that start one isolated worker.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Resolve the worker from configuration, defaulting to this executable's
    /// hidden `worker` subcommand.
    pub fn from_config(config: &SandboxedConfig) -> Result<Self> {
        let program = match &config.worker_program {
            Some(path) => path.clone(),
            None => std::env::current_exe().map_err(|e| CodepadError::WorkerStart {
                program: "codepad".to_string(),
                reason: format!("cannot locate the running executable: {}", e),
            })?,
        };

        Ok(Self {
            program,
            args: config.worker_args.clone(),
        })
    }
}

/// A disposable worker process reached only through one request message and
/// one reply message.
///
/// The child is spawned with kill-on-drop, so dropping the context tears the
/// process down even if [`IsolatedContext::terminate`] is never reached.
pub struct IsolatedContext {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    terminated: bool,
}

impl IsolatedContext {
    pub fn spawn(command: &WorkerCommand) -> Result<Self> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::null());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| CodepadError::WorkerStart {
            program: command.program.display().to_string(),
            reason: e.to_string(),
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().map(BufReader::new);

        debug!(pid = ?child.id(), "Isolated context started");

        Ok(Self {
            child,
            stdin,
            stdout,
            terminated: false,
        })
    }

    /// Send the single request message. The input channel is closed afterwards.
    pub async fn post(&mut self, source: &str) -> Result<()> {
        self.post_request(&WorkerRequest::new(source)).await
    }

    pub async fn post_request(&mut self, request: &WorkerRequest) -> Result<()> {
        if self.terminated {
            return Err(CodepadError::ContextTerminated);
        }
        let mut stdin = self.stdin.take().ok_or_else(|| {
            CodepadError::WorkerProtocol("isolated context accepts a single message".to_string())
        })?;

        let request = serde_json::to_string(request)?;
        stdin.write_all(request.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;

        Ok(())
    }

    /// Wait for the single reply message.
    pub async fn receive(&mut self) -> Result<String> {
        if self.terminated {
            return Err(CodepadError::ContextTerminated);
        }
        let stdout = self
            .stdout
            .as_mut()
            .ok_or(CodepadError::ContextTerminated)?;

        let mut line = String::new();
        let bytes_read = stdout.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Err(CodepadError::WorkerProtocol(
                "worker exited without replying".to_string(),
            ));
        }

        let reply: WorkerReply = serde_json::from_str(line.trim())
            .map_err(|e| CodepadError::WorkerProtocol(format!("invalid reply: {}", e)))?;

        match reply {
            WorkerReply::Output { text } => Ok(text),
            WorkerReply::Error { message } => Err(CodepadError::Evaluation(message)),
        }
    }

    /// Kill the worker and reap it. Safe to call more than once.
    pub async fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.stdin = None;
        self.stdout = None;

        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "Failed to kill isolated context");
        }
        debug!("Isolated context terminated");
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// OS process id, `None` once the worker has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

/// JavaScript backend that evaluates every run in a fresh worker process.
///
/// The backend owns its timer: if the worker has not replied within the
/// configured budget it is killed and the run reports a timeout.
pub struct SandboxedBackend {
    worker: WorkerCommand,
    timeout: Duration,
    loop_iteration_limit: Option<u64>,
}

impl SandboxedBackend {
    pub fn new(config: SandboxedConfig) -> Result<Self> {
        let worker = WorkerCommand::from_config(&config)?;
        info!(worker = %worker.program.display(), "Sandboxed backend using worker");
        Ok(Self::with_worker(worker, Duration::from_millis(config.timeout_ms)))
    }

    pub fn with_worker(worker: WorkerCommand, timeout: Duration) -> Self {
        Self {
            worker,
            timeout,
            loop_iteration_limit: None,
        }
    }

    /// Engine loop cap sent with every request, so the worker applies the
    /// same limit as the in-process engine whatever config it loads itself.
    pub fn with_loop_iteration_limit(mut self, limit: Option<u64>) -> Self {
        self.loop_iteration_limit = limit;
        self
    }
}

#[async_trait]
impl Backend for SandboxedBackend {
    fn name(&self) -> &str {
        "sandboxed"
    }

    fn language(&self) -> Language {
        Language::Sandboxed
    }

    async fn execute(&self, source: &str) -> Result<ExecutionOutput> {
        let mut context = IsolatedContext::spawn(&self.worker)?;

        let request = WorkerRequest {
            source: source.to_string(),
            loop_iteration_limit: self.loop_iteration_limit,
        };
        let exchange = async {
            context.post_request(&request).await?;
            context.receive().await
        };
        let result = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(reply) => reply,
            Err(_) => {
                debug!(timeout_ms = self.timeout.as_millis() as u64, "Worker did not reply in time");
                Err(CodepadError::Timeout {
                    millis: self.timeout.as_millis() as u64,
                })
            }
        };

        context.terminate().await;

        result.map(ExecutionOutput::text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    use crate::runner::{BackendRegistry, Dispatcher, ExecutionOutcome};

    fn shell_worker(script: &str) -> WorkerCommand {
        WorkerCommand {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[tokio::test]
    async fn test_reply_is_relayed() {
        let backend = SandboxedBackend::with_worker(
            shell_worker(r#"read line; printf '%s\n' '{"type":"output","text":"hi\n"}'"#),
            Duration::from_secs(5),
        );
        let output = backend.execute("ignored").await.unwrap();
        assert_eq!(output.text, "hi\n");
    }

    #[tokio::test]
    async fn test_error_reply_is_evaluation_error() {
        let backend = SandboxedBackend::with_worker(
            shell_worker(r#"read line; printf '%s\n' '{"type":"error","message":"boom"}'"#),
            Duration::from_secs(5),
        );
        match backend.execute("ignored").await {
            Err(CodepadError::Evaluation(message)) => assert_eq!(message, "boom"),
            other => panic!("expected evaluation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_exit_is_protocol_error() {
        let backend =
            SandboxedBackend::with_worker(shell_worker("read line; exit 0"), Duration::from_secs(5));
        assert!(matches!(
            backend.execute("ignored").await,
            Err(CodepadError::WorkerProtocol(_))
        ));
    }

    #[tokio::test]
    async fn test_runaway_worker_times_out() {
        let backend =
            SandboxedBackend::with_worker(shell_worker("sleep 30"), Duration::from_millis(200));
        let started = Instant::now();
        let result = backend.execute("while (true) {}").await;
        assert!(matches!(result, Err(CodepadError::Timeout { millis: 200 })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_terminated_context_accepts_no_messages() {
        let mut context = IsolatedContext::spawn(&shell_worker("sleep 30")).unwrap();
        context.post("first").await.unwrap();
        assert!(
            tokio::time::timeout(Duration::from_millis(100), context.receive())
                .await
                .is_err()
        );

        context.terminate().await;
        assert!(context.is_terminated());
        assert!(context.id().is_none());
        assert!(matches!(
            context.post("second").await,
            Err(CodepadError::ContextTerminated)
        ));
        assert!(matches!(
            context.receive().await,
            Err(CodepadError::ContextTerminated)
        ));
    }

    #[tokio::test]
    async fn test_missing_worker_program() {
        let backend = SandboxedBackend::with_worker(
            WorkerCommand {
                program: PathBuf::from("/nonexistent/codepad-worker"),
                args: vec![],
            },
            Duration::from_secs(1),
        );
        assert!(matches!(
            backend.execute("1").await,
            Err(CodepadError::WorkerStart { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_worker_is_not_reported_as_unsupported() {
        let backend = SandboxedBackend::with_worker(
            WorkerCommand {
                program: PathBuf::from("/nonexistent/codepad-worker"),
                args: vec![],
            },
            Duration::from_secs(1),
        );
        let dispatcher = Dispatcher::new(Arc::new(BackendRegistry::new([
            Arc::new(backend) as Arc<dyn Backend>
        ])));

        match dispatcher
            .execute_tagged("javascript", "console.log(1)", 3000)
            .await
        {
            ExecutionOutcome::BackendError { message } => {
                assert!(
                    message.starts_with("failed to start worker '/nonexistent/codepad-worker'"),
                    "{}",
                    message
                );
            }
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_carries_loop_iteration_limit() {
        let worker = shell_worker(
            r#"read line; case "$line" in
                *'"loop_iteration_limit":10'*) printf '%s\n' '{"type":"output","text":"limited"}' ;;
                *) printf '%s\n' '{"type":"output","text":"unlimited"}' ;;
            esac"#,
        );

        let limited = SandboxedBackend::with_worker(worker.clone(), Duration::from_secs(5))
            .with_loop_iteration_limit(Some(10));
        assert_eq!(limited.execute("1").await.unwrap().text, "limited");

        let unlimited = SandboxedBackend::with_worker(worker, Duration::from_secs(5));
        assert_eq!(unlimited.execute("1").await.unwrap().text, "unlimited");
    }
}
