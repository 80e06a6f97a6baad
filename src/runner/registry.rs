use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::types::CodepadConfig;
use crate::error::Result;
use crate::language::Language;
use crate::runner::traits::Backend;

#[cfg(feature = "js")]
use crate::runner::backends::ScriptBackend;
use crate::runner::backends::{CompiledBackend, ManagedBackend, MarkupBackend, SandboxedBackend};

/// Mapping from language tag to the backend that serves it.
///
/// Built once at startup and never mutated afterwards; the dispatcher shares
/// it read-only.
pub struct BackendRegistry {
    backends: HashMap<Language, Arc<dyn Backend>>,
}

impl BackendRegistry {
    /// Build a registry keyed by each backend's own language. A later backend
    /// for the same language replaces an earlier one.
    pub fn new(backends: impl IntoIterator<Item = Arc<dyn Backend>>) -> Self {
        let backends = backends
            .into_iter()
            .map(|backend| (backend.language(), backend))
            .collect();
        Self { backends }
    }

    pub fn get(&self, language: Language) -> Option<Arc<dyn Backend>> {
        self.backends.get(&language).cloned()
    }

    /// Registered languages in canonical order.
    pub fn languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|language| self.backends.contains_key(language))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Create the registry from configuration.
///
/// Disabled backends, and backends whose support was not compiled in, are left
/// out; requests for them are reported as unsupported. The managed runtime
/// starts loading in the background before this returns.
pub async fn create_registry(config: &CodepadConfig) -> Result<BackendRegistry> {
    let mut backends: Vec<Arc<dyn Backend>> = Vec::new();

    if config.script.enabled {
        #[cfg(feature = "js")]
        backends.push(Arc::new(ScriptBackend::new(config.script.clone())));

        #[cfg(not(feature = "js"))]
        warn!("Script backend enabled but JavaScript support was not compiled in");
    }

    if config.sandboxed.enabled {
        match SandboxedBackend::new(config.sandboxed.clone()) {
            Ok(backend) => backends.push(Arc::new(
                backend.with_loop_iteration_limit(config.script.loop_iteration_limit),
            )),
            Err(e) => warn!(error = %e, "Sandboxed backend unavailable"),
        }
    }

    if config.managed.enabled {
        backends.push(Arc::new(ManagedBackend::start(config.managed.clone())));
    }

    if config.compiled.enabled {
        backends.push(Arc::new(CompiledBackend::new(config.compiled.clone())?));
    }

    if config.markup.enabled {
        backends.push(Arc::new(MarkupBackend));
    }

    let registry = BackendRegistry::new(backends);
    info!(
        languages = ?registry.languages(),
        "Backend registry ready"
    );

    Ok(registry)
}

/// Get information about every language's backend under this configuration.
pub fn available_backends(config: &CodepadConfig) -> Vec<BackendInfo> {
    Language::ALL
        .into_iter()
        .map(|language| {
            let (enabled, description) = match language {
                Language::Script => (
                    config.script.enabled,
                    "In-process JavaScript engine (no isolation)",
                ),
                Language::Sandboxed => (
                    config.sandboxed.enabled,
                    "JavaScript in a disposable worker process",
                ),
                Language::Managed => (config.managed.enabled, "Hosted Python interpreter"),
                Language::Compiled => (config.compiled.enabled, "Remote Java compile service"),
                Language::Markup => (config.markup.enabled, "HTML document passthrough"),
            };

            let unavailable_reason = if !enabled {
                Some("Disabled in configuration".to_string())
            } else if requires_js(language) && !cfg!(feature = "js") {
                Some("Not compiled in (use --features js)".to_string())
            } else {
                None
            };

            BackendInfo {
                language,
                available: unavailable_reason.is_none(),
                description,
                unavailable_reason,
            }
        })
        .collect()
}

fn requires_js(language: Language) -> bool {
    matches!(language, Language::Script | Language::Sandboxed)
}

/// Information about a language backend.
pub struct BackendInfo {
    pub language: Language,
    pub available: bool,
    pub description: &'static str,
    pub unavailable_reason: Option<String>,
}
