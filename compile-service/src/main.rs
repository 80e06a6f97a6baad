//! Codepad compile service
//!
//! HTTP front for the compiled-language backend. Each request carries a
//! complete compilation unit which is written to disk, compiled and run.
//!
//! Protocol:
//! - `POST /run` with `{"code": "..."}`
//! - Always answers 200 with `{"output": "...", "failed": bool}`
//! - `GET /health` answers `ok`

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::process::Command;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[clap(name = "codepad-compile-service")]
#[clap(version, about = "Compile-and-run service for codepad's Java backend")]
struct Args {
    /// Address to bind
    #[clap(long, default_value = "0.0.0.0", env = "CODEPAD_SERVICE_HOST")]
    host: String,

    /// Port to listen on
    #[clap(long, default_value_t = 5000, env = "CODEPAD_SERVICE_PORT")]
    port: u16,

    /// Directory the source file is written to in shared mode
    #[clap(long, default_value = ".", env = "CODEPAD_SERVICE_WORKDIR")]
    workdir: PathBuf,

    /// File name the submitted code is saved as
    #[clap(long, default_value = "Main.java", env = "CODEPAD_SERVICE_SOURCE_FILE")]
    source_file: String,

    /// Shell command that compiles and runs the source file
    #[clap(
        long,
        default_value = "javac Main.java && java Main",
        env = "CODEPAD_SERVICE_COMMAND"
    )]
    command: String,

    /// Where each request compiles
    #[clap(long, default_value = "shared", value_enum, env = "CODEPAD_SERVICE_WORKSPACE")]
    workspace: WorkspaceMode,

    /// Verbosity level (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum WorkspaceMode {
    /// Every request writes to the same file in `--workdir`; concurrent
    /// requests can overwrite each other's source
    #[default]
    Shared,
    /// Every request gets a fresh temporary directory
    PerRequest,
}

#[derive(Debug, Deserialize)]
struct RunRequest {
    code: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct RunResponse {
    output: String,
    failed: bool,
}

impl RunResponse {
    fn ok(output: String) -> Self {
        Self {
            output,
            failed: false,
        }
    }

    fn failed(output: String) -> Self {
        Self {
            output,
            failed: true,
        }
    }
}

#[derive(Debug, Clone)]
struct ServiceConfig {
    workdir: PathBuf,
    source_file: String,
    command: String,
    workspace: WorkspaceMode,
}

type AppState = Arc<ServiceConfig>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;

    let config = ServiceConfig {
        workdir: args.workdir,
        source_file: args.source_file,
        command: args.command,
        workspace: args.workspace,
    };
    info!(
        workdir = %config.workdir.display(),
        workspace = ?config.workspace,
        command = %config.command,
        "Starting compile service"
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, router(Arc::new(config)))
        .await
        .context("server error")?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/run", post(run_code))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn run_code(State(config): State<AppState>, Json(request): Json<RunRequest>) -> Json<RunResponse> {
    debug!(code_len = request.code.len(), "Received run request");

    let response = match config.workspace {
        WorkspaceMode::Shared => run_in(&config, &config.workdir, &request.code).await,
        WorkspaceMode::PerRequest => match tempfile::tempdir() {
            // Dropping the guard removes the directory after the run
            Ok(dir) => run_in(&config, dir.path(), &request.code).await,
            Err(e) => RunResponse::failed(format!("failed to create workspace: {}", e)),
        },
    };

    if response.failed {
        debug!("Run failed");
    }
    Json(response)
}

/// Write the source into `dir` and run the pipeline there.
async fn run_in(config: &ServiceConfig, dir: &Path, code: &str) -> RunResponse {
    let source_path = dir.join(&config.source_file);
    if let Err(e) = tokio::fs::write(&source_path, code).await {
        warn!(path = %source_path.display(), error = %e, "Failed to write source");
        return RunResponse::failed(format!("failed to write source: {}", e));
    }

    let output = match Command::new("sh")
        .arg("-c")
        .arg(&config.command)
        .current_dir(dir)
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            warn!(error = %e, "Failed to spawn pipeline");
            return RunResponse::failed(format!("failed to run pipeline: {}", e));
        }
    };

    if output.status.success() {
        RunResponse::ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        RunResponse::failed(String::from_utf8_lossy(&output.stderr).into_owned())
    }
}

fn init_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
