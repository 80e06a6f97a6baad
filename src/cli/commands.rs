use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::cli::args::{ConfigAction, ConfigArgs, InitArgs, NewArgs, OutputFormat, RunArgs};
use crate::config::loader::get_config_path;
use crate::config::types::CodepadConfig;
use crate::error::{CodepadError, Result};
use crate::language::Language;
use crate::runner::{available_backends, create_registry, Dispatcher, ExecutionOutcome};

// ============================================================================
// Execution Commands
// ============================================================================

/// Execute one snippet through the dispatcher
pub async fn run(args: RunArgs, mut config: CodepadConfig, format: OutputFormat) -> Result<()> {
    if let Some(endpoint) = args.endpoint.clone() {
        config.compiled.endpoint = endpoint;
    }

    let source = read_source(&args).await?;
    let timeout_ms = args.timeout_ms.unwrap_or(config.dispatcher.timeout_ms);
    info!(language = %args.language, timeout_ms, "Running snippet");

    let registry = create_registry(&config).await?;
    let dispatcher = Dispatcher::with_policy(Arc::new(registry), config.dispatcher.timeout_policy);

    // A one-shot run has nothing else to do while the runtime loads
    if let Ok(language) = args.language.parse::<Language>() {
        if let Some(backend) = dispatcher.registry().get(language) {
            let init_timeout = Duration::from_millis(config.managed.init_timeout_ms);
            if let Err(e) = backend.wait_ready(init_timeout).await {
                debug!(error = %e, "Backend did not become ready");
            }
        }
    }

    let outcome = dispatcher
        .execute_tagged(&args.language, &source, timeout_ms)
        .await;

    let rendered = format_outcome(&outcome, &format)?;
    if rendered.ends_with('\n') {
        print!("{}", rendered);
    } else {
        println!("{}", rendered);
    }
    if !outcome.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// List every language and whether its backend can be used
pub async fn languages(config: CodepadConfig, format: OutputFormat) -> Result<()> {
    let infos = available_backends(&config);

    match format {
        OutputFormat::Text => {
            println!("{:<12} {:<22} {:<10} DESCRIPTION", "TAG", "LANGUAGE", "STATUS");
            println!("{}", "-".repeat(80));

            for info in infos {
                let status = if info.available { "ready" } else { "disabled" };
                let reason = info
                    .unavailable_reason
                    .map(|r| format!(" ({})", r))
                    .unwrap_or_default();
                println!(
                    "{:<12} {:<22} {:<10} {}{}",
                    info.language.tag(),
                    info.language.display_name(),
                    status,
                    info.description,
                    reason
                );
            }
        }
        OutputFormat::Json => {
            let json_infos: Vec<_> = infos
                .iter()
                .map(|info| {
                    serde_json::json!({
                        "tag": info.language.tag(),
                        "name": info.language.display_name(),
                        "available": info.available,
                        "description": info.description,
                        "unavailable_reason": info.unavailable_reason,
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&json_infos)?);
        }
    }

    Ok(())
}

/// Print the snippet a fresh editor starts with
pub async fn new(args: NewArgs, format: OutputFormat) -> Result<()> {
    let snippet = args.language.starter_snippet();

    match format {
        OutputFormat::Text => println!("{}", snippet),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "language": args.language,
                    "source": snippet,
                })
            );
        }
    }

    Ok(())
}

/// Serve the isolated worker protocol on stdin/stdout
pub fn worker(config: CodepadConfig) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    crate::worker::serve(
        stdin.lock(),
        stdout.lock(),
        config.script.loop_iteration_limit,
    )?;
    Ok(())
}

// ============================================================================
// Config Commands
// ============================================================================

pub async fn init(args: InitArgs) -> Result<()> {
    let config_path = get_config_path();

    if config_path.exists() && !args.force {
        println!("Configuration already exists at: {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    // Create parent directories if needed
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Write default configuration
    let default_config = CodepadConfig::default();
    let toml_str =
        toml::to_string_pretty(&default_config).map_err(|e| CodepadError::Config(e.to_string()))?;

    std::fs::write(&config_path, toml_str)?;

    println!("Created configuration at: {}", config_path.display());
    println!("\nQuick start:");
    println!("  # Run JavaScript in an isolated worker");
    println!("  codepad run --language javascript --code \"console.log('hola')\"");
    println!();
    println!("  # Run a Python file");
    println!("  codepad run --language python main.py");
    println!();
    println!("  # Run Java against a compile service");
    println!("  codepad run --language java --endpoint http://localhost:5000 Main.java");

    Ok(())
}

pub async fn config(args: ConfigArgs, config: CodepadConfig) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let toml_str =
                toml::to_string_pretty(&config).map_err(|e| CodepadError::Config(e.to_string()))?;
            println!("{}", toml_str);
        }
        ConfigAction::Path => {
            println!("{}", get_config_path().display());
        }
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

async fn read_source(args: &RunArgs) -> Result<String> {
    if let Some(code) = &args.code {
        return Ok(code.clone());
    }

    if let Some(path) = &args.file {
        return Ok(tokio::fs::read_to_string(path).await?);
    }

    let mut source = String::new();
    tokio::io::stdin().read_to_string(&mut source).await?;
    Ok(source)
}

fn format_outcome(outcome: &ExecutionOutcome, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(outcome.to_string()),
        OutputFormat::Json => Ok(serde_json::to_string(outcome)?),
    }
}
