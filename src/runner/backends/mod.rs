#[cfg(feature = "js")]
mod script;

#[cfg(feature = "js")]
pub use script::{evaluate_script, ScriptBackend};

mod compiled;
mod managed;
mod markup;
mod sandboxed;

pub use compiled::{wrap_java, CompiledBackend, RemoteCompileJob, RunRequest, RunResponse};
pub use managed::{wrap_python, ManagedBackend, PythonRuntime, RuntimeState};
pub use markup::{wrap_document, MarkupBackend};
pub use sandboxed::{IsolatedContext, SandboxedBackend, WorkerCommand};
