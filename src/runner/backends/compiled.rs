use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::types::CompiledConfig;
use crate::error::{CodepadError, Result};
use crate::language::Language;
use crate::runner::traits::Backend;
use crate::runner::ExecutionOutput;

/// Embed statement-level Java into a single-class program with a `main` entry point.
pub fn wrap_java(source: &str) -> String {
    format!(
        "\npublic class Main {{\n  public static void main(String[] args) {{\n    {}\n  }}\n}}",
        source
    )
}

/// Body of `POST /run`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub code: String,
}

/// Response of `POST /run`; `failed` is absent in responses from services that
/// only report `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResponse {
    pub output: String,
    #[serde(default)]
    pub failed: bool,
}

/// Wrapped source ready for one submission to the compile service.
#[derive(Debug)]
pub struct RemoteCompileJob {
    wrapped_source: String,
}

impl RemoteCompileJob {
    pub fn new(source: &str) -> Self {
        Self {
            wrapped_source: wrap_java(source),
        }
    }

    pub fn wrapped_source(&self) -> &str {
        &self.wrapped_source
    }

    fn into_request(self) -> RunRequest {
        RunRequest {
            code: self.wrapped_source,
        }
    }
}

/// Java backend that ships snippets to the remote compile-and-run service.
///
/// The service compiles every request at one fixed path, so concurrent
/// submissions from different callers can overwrite each other's source and
/// class files.
pub struct CompiledBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl CompiledBackend {
    pub fn new(config: CompiledConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| CodepadError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
        })
    }

    fn run_url(&self) -> String {
        format!("{}/run", self.endpoint.trim_end_matches('/'))
    }

    /// Send one job and return the service's response.
    pub async fn submit(&self, job: RemoteCompileJob) -> Result<RunResponse> {
        let url = self.run_url();
        debug!(url = %url, code_len = job.wrapped_source().len(), "Submitting compile job");

        let response = self
            .client
            .post(&url)
            .json(&job.into_request())
            .send()
            .await
            .map_err(|e| {
                CodepadError::Transport(format!("cannot reach compile service at {}: {}", url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CodepadError::Transport(format!(
                "compile service responded with HTTP {}",
                status
            )));
        }

        response.json::<RunResponse>().await.map_err(|e| {
            CodepadError::Transport(format!("invalid response from compile service: {}", e))
        })
    }
}

#[async_trait]
impl Backend for CompiledBackend {
    fn name(&self) -> &str {
        "remote-compile"
    }

    fn language(&self) -> Language {
        Language::Compiled
    }

    async fn execute(&self, source: &str) -> Result<ExecutionOutput> {
        let response = self.submit(RemoteCompileJob::new(source)).await?;

        if response.failed {
            let message = if response.output.is_empty() {
                "compilation failed".to_string()
            } else {
                response.output
            };
            return Err(CodepadError::Evaluation(message));
        }

        Ok(ExecutionOutput::text_or_marker(response.output))
    }
}
