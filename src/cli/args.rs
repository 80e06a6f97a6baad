use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::language::Language;

#[derive(Parser, Debug)]
#[clap(name = "codepad")]
#[clap(version, about = "Multi-language code playground runner")]
#[clap(propagate_version = true)]
pub struct Cli {
    #[clap(flatten)]
    pub global_opts: GlobalOpts,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Configuration file path
    #[clap(short, long, global = true, env = "CODEPAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[clap(long, global = true, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a snippet and print its outcome
    Run(RunArgs),

    /// List languages and whether their backend is available
    Languages,

    /// Print the starter snippet for a language
    New(NewArgs),

    /// Initialize a new codepad configuration
    Init(InitArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Serve one isolated JavaScript evaluation over stdin/stdout
    #[clap(hide = true)]
    Worker,
}

// ============================================================================
// Execution Commands
// ============================================================================

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Language tag (javascript, js-inline, python, java, html, ...)
    #[clap(long, short = 'l')]
    pub language: String,

    /// Source file to execute (reads stdin if neither FILE nor --code is given)
    #[clap(conflicts_with = "code")]
    pub file: Option<PathBuf>,

    /// Inline source to execute
    #[clap(long, short = 'e')]
    pub code: Option<String>,

    /// Execution budget in milliseconds (overrides configuration)
    #[clap(long)]
    pub timeout_ms: Option<u64>,

    /// Compile service base URL (overrides configuration)
    #[clap(long, env = "CODEPAD_COMPILE_ENDPOINT")]
    pub endpoint: Option<String>,
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Language to start a snippet for
    #[clap(long, short = 'l', value_enum)]
    pub language: Language,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force overwrite existing configuration
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[clap(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
}

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
