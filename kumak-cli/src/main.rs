//! Kumak CLI — terminal interface for the Kumak business advisor.
//!
//! Runs one-shot deep research reports or an interactive advisory chat.

mod commands;
mod repl;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Kumak: an AI consultant for small businesses
#[derive(Parser, Debug)]
#[command(name = "kumak", version, about, long_about = None)]
struct Cli {
    /// LLM model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run deep research on a topic and print the report
    Research {
        /// The topic to research
        topic: String,
        /// Print the report as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// Start an interactive advisory conversation
    Chat,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default configuration file into the workspace
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "kumak", "kumak")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "kumak.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.model).await
}
