use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::language::Language;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodepadConfig {
    pub dispatcher: DispatcherConfig,
    pub script: ScriptConfig,
    pub sandboxed: SandboxedConfig,
    pub managed: ManagedConfig,
    pub compiled: CompiledConfig,
    pub markup: MarkupConfig,
}

/// Which languages the dispatcher races against the time budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeoutPolicy {
    /// Every backend is raced against the budget
    #[default]
    Uniform,
    /// Only the sandboxed worker is; other backends run until they finish
    SandboxedOnly,
}

impl TimeoutPolicy {
    pub fn applies_to(&self, language: Language) -> bool {
        match self {
            Self::Uniform => true,
            Self::SandboxedOnly => language == Language::Sandboxed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Execution budget in milliseconds
    pub timeout_ms: u64,
    /// Which backends the budget applies to
    pub timeout_policy: TimeoutPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

/// In-process JavaScript configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub enabled: bool,
    /// Engine-level cap on loop iterations (unbounded if not set)
    pub loop_iteration_limit: Option<u64>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            loop_iteration_limit: None,
        }
    }
}

/// Worker-process JavaScript configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxedConfig {
    pub enabled: bool,
    /// Budget after which the worker is killed
    pub timeout_ms: u64,
    /// Worker executable (defaults to the running codepad binary)
    pub worker_program: Option<PathBuf>,
    /// Arguments passed to the worker executable
    pub worker_args: Vec<String>,
}

impl Default for SandboxedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 3000,
            worker_program: None,
            worker_args: vec!["worker".to_string()],
        }
    }
}

/// Hosted Python interpreter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedConfig {
    pub enabled: bool,
    /// Interpreter path (searched on PATH if not set)
    pub interpreter: Option<PathBuf>,
    /// Executable names tried on PATH, in order
    pub candidates: Vec<String>,
    /// How long initialisation may take before it is marked failed
    pub init_timeout_ms: u64,
}

impl Default for ManagedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interpreter: None,
            candidates: vec!["python3".to_string(), "python".to_string()],
            init_timeout_ms: 10_000,
        }
    }
}

/// Remote compile service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompiledConfig {
    pub enabled: bool,
    /// Base URL of the compile service
    pub endpoint: String,
    /// Client-side HTTP timeout (none if not set)
    pub request_timeout_ms: Option<u64>,
}

impl Default for CompiledConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:5000".to_string(),
            request_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    pub enabled: bool,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
