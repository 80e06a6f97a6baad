use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::types::ManagedConfig;
use crate::error::{CodepadError, Result};
use crate::language::Language;
use crate::runner::traits::Backend;
use crate::runner::ExecutionOutput;

/// Runs the wrapped program read from stdin and writes the value of its final
/// expression to the real stdout.
const DRIVER: &str = r#"
import ast, sys
source = sys.stdin.read()
tree = ast.parse(source, "<playground>", "exec")
last = tree.body.pop() if tree.body and isinstance(tree.body[-1], ast.Expr) else None
namespace = {"__name__": "__main__"}
exec(compile(tree, "<playground>", "exec"), namespace)
value = eval(compile(ast.Expression(last.value), "<playground>", "eval"), namespace) if last is not None else None
sys.stdout = sys.__stdout__
if value is not None:
    sys.stdout.write(str(value))
    sys.stdout.flush()
"#;

/// Redirect stdout into a buffer, run the snippet, and end on the buffer's value.
pub fn wrap_python(source: &str) -> String {
    format!(
        "\nimport sys\nimport io\nsys.stdout = io.StringIO()\n{}\nsys.stdout.getvalue()",
        source.trim()
    )
}

/// Handle to a located, verified Python interpreter.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    pub interpreter: PathBuf,
    pub version: String,
}

impl PythonRuntime {
    /// Locate the interpreter and check that it starts.
    ///
    /// Checks in order:
    /// 1. Configured interpreter path
    /// 2. Each candidate name on PATH
    pub async fn load(config: &ManagedConfig) -> Result<Self> {
        let interpreter = resolve_interpreter(config)?;

        let output = Command::new(&interpreter)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                CodepadError::RuntimeUnavailable(format!(
                    "cannot start {}: {}",
                    interpreter.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(CodepadError::RuntimeUnavailable(format!(
                "{} --version exited with {}",
                interpreter.display(),
                output.status
            )));
        }

        // Older interpreters report the version on stderr
        let raw = if output.stdout.is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        let version = String::from_utf8_lossy(raw).trim().to_string();

        info!(version = %version, path = %interpreter.display(), "Python runtime ready");

        Ok(Self {
            interpreter,
            version,
        })
    }

    /// Run an already-wrapped program and return the final expression's value.
    pub async fn run(&self, wrapped: &str) -> Result<String> {
        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(DRIVER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(wrapped.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        debug!(
            exit_code = ?output.status.code(),
            stdout_len = output.stdout.len(),
            stderr_len = stderr.len(),
            "Python run completed"
        );

        if !output.status.success() {
            let message = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("Python exited with an error")
                .trim()
                .to_string();
            return Err(CodepadError::Evaluation(message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn resolve_interpreter(config: &ManagedConfig) -> Result<PathBuf> {
    if let Some(path) = &config.interpreter {
        return Ok(path.clone());
    }

    config
        .candidates
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| {
            CodepadError::RuntimeUnavailable(format!(
                "no Python interpreter found on PATH (tried {})",
                config.candidates.join(", ")
            ))
        })
}

/// Lifecycle of the hosted interpreter.
#[derive(Debug, Clone)]
pub enum RuntimeState {
    Loading,
    Ready(Arc<PythonRuntime>),
    Failed(String),
}

/// Python backend backed by a hosted interpreter that loads once, asynchronously.
///
/// Until loading finishes every run fails fast with `RuntimeNotReady`; nothing
/// is queued.
pub struct ManagedBackend {
    config: ManagedConfig,
    state: Arc<watch::Sender<RuntimeState>>,
}

impl ManagedBackend {
    /// Create the backend in the `Loading` state without starting initialisation.
    pub fn new(config: ManagedConfig) -> Self {
        let (state, _) = watch::channel(RuntimeState::Loading);
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Create the backend and spawn its initialisation on the current runtime.
    pub fn start(config: ManagedConfig) -> Self {
        let backend = Self::new(config);
        let state = backend.state.clone();
        let config = backend.config.clone();
        tokio::spawn(async move {
            initialize(&config, &state).await;
        });
        backend
    }

    /// Load the interpreter now. Subsequent calls are no-ops once settled.
    pub async fn initialize(&self) {
        initialize(&self.config, &self.state).await;
    }

    pub fn state(&self) -> RuntimeState {
        (*self.state.borrow()).clone()
    }

    fn runtime(&self) -> Result<Arc<PythonRuntime>> {
        match &*self.state.borrow() {
            RuntimeState::Ready(runtime) => Ok(runtime.clone()),
            RuntimeState::Loading => Err(CodepadError::RuntimeNotReady),
            RuntimeState::Failed(reason) => Err(CodepadError::RuntimeUnavailable(reason.clone())),
        }
    }
}

async fn initialize(config: &ManagedConfig, state: &watch::Sender<RuntimeState>) {
    if !matches!(*state.borrow(), RuntimeState::Loading) {
        return;
    }

    let timeout = Duration::from_millis(config.init_timeout_ms);
    let next = match tokio::time::timeout(timeout, PythonRuntime::load(config)).await {
        Ok(Ok(runtime)) => RuntimeState::Ready(Arc::new(runtime)),
        Ok(Err(e)) => {
            warn!(error = %e, "Python runtime failed to load");
            match e {
                CodepadError::RuntimeUnavailable(reason) => RuntimeState::Failed(reason),
                other => RuntimeState::Failed(other.to_string()),
            }
        }
        Err(_) => {
            warn!(timeout_ms = config.init_timeout_ms, "Python runtime load timed out");
            RuntimeState::Failed(format!(
                "interpreter did not start within {} ms",
                config.init_timeout_ms
            ))
        }
    };
    state.send_replace(next);
}

#[async_trait]
impl Backend for ManagedBackend {
    fn name(&self) -> &str {
        "managed"
    }

    fn language(&self) -> Language {
        Language::Managed
    }

    async fn execute(&self, source: &str) -> Result<ExecutionOutput> {
        let runtime = self.runtime()?;
        debug!(source_len = source.len(), "Running Python snippet");

        let captured = runtime.run(&wrap_python(source)).await?;
        Ok(ExecutionOutput::text_or_marker(captured))
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.state.subscribe();
        let settled = async {
            loop {
                let current = (*rx.borrow_and_update()).clone();
                match current {
                    RuntimeState::Ready(_) => return Ok(()),
                    RuntimeState::Failed(reason) => {
                        return Err(CodepadError::RuntimeUnavailable(reason))
                    }
                    RuntimeState::Loading => {}
                }
                if rx.changed().await.is_err() {
                    return Err(CodepadError::RuntimeNotReady);
                }
            }
        };

        tokio::time::timeout(timeout, settled)
            .await
            .map_err(|_| CodepadError::RuntimeNotReady)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn python_available() -> bool {
        which::which("python3").is_ok()
    }

    #[test]
    fn test_wrap_python() {
        let wrapped = wrap_python("  print('hi')\n");
        assert_eq!(
            wrapped,
            "\nimport sys\nimport io\nsys.stdout = io.StringIO()\nprint('hi')\nsys.stdout.getvalue()"
        );
    }

    #[tokio::test]
    async fn test_not_ready_fails_fast() {
        let backend = ManagedBackend::new(ManagedConfig::default());
        let started = Instant::now();
        assert!(matches!(
            backend.execute("print(1)").await,
            Err(CodepadError::RuntimeNotReady)
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(backend.state(), RuntimeState::Loading));
    }

    #[tokio::test]
    async fn test_wait_ready_times_out_while_loading() {
        let backend = ManagedBackend::new(ManagedConfig::default());
        assert!(matches!(
            backend.wait_ready(Duration::from_millis(50)).await,
            Err(CodepadError::RuntimeNotReady)
        ));
    }

    #[tokio::test]
    async fn test_failed_load_is_reported() {
        let backend = ManagedBackend::new(ManagedConfig {
            interpreter: Some(PathBuf::from("/nonexistent/python3")),
            ..ManagedConfig::default()
        });
        backend.initialize().await;

        assert!(matches!(backend.state(), RuntimeState::Failed(_)));
        assert!(matches!(
            backend.execute("print(1)").await,
            Err(CodepadError::RuntimeUnavailable(_))
        ));
        assert!(matches!(
            backend.wait_ready(Duration::from_millis(50)).await,
            Err(CodepadError::RuntimeUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_candidates() {
        let config = ManagedConfig {
            candidates: vec!["codepad-no-such-python".to_string()],
            ..ManagedConfig::default()
        };
        assert!(matches!(
            PythonRuntime::load(&config).await,
            Err(CodepadError::RuntimeUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        if !python_available() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let backend = ManagedBackend::start(ManagedConfig::default());
        backend.wait_ready(Duration::from_secs(10)).await.unwrap();

        let output = backend.execute("print('hola')\nprint(1 + 1)").await.unwrap();
        assert_eq!(output.text, "hola\n2\n");

        let output = backend.execute("x = 1").await.unwrap();
        assert_eq!(output.text, crate::runner::NO_OUTPUT);
    }

    #[tokio::test]
    async fn test_interpreter_exception() {
        if !python_available() {
            eprintln!("skipping: python3 not installed");
            return;
        }
        let backend = ManagedBackend::new(ManagedConfig::default());
        backend.initialize().await;

        match backend.execute("raise ValueError('bad value')").await {
            Err(CodepadError::Evaluation(message)) => {
                assert_eq!(message, "ValueError: bad value")
            }
            other => panic!("expected evaluation error, got {:?}", other),
        }
    }
}
