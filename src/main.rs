mod commands;
mod config;
mod conversation;
mod error;
mod events;
mod llm;
mod prompts;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "softsell-chat")]
#[command(version)]
#[command(about = "SoftSell support chat widget", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to ~/.softsell/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask { question: String },
    /// List the suggested quick questions
    Questions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        None => {
            // the widget owns the terminal, so logs go to a file
            if let Err(err) = setup_file_tracing(&config.log_dir, cli.verbose) {
                eprintln!("⚠️  Logging disabled: {err:#}");
            }
            commands::start_widget(config).await
        }
        Some(Commands::Ask { question }) => {
            setup_stderr_tracing(cli.verbose);
            commands::ask(config, &question).await
        }
        Some(Commands::Questions) => {
            commands::list_questions(&config);
            Ok(())
        }
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("softsell_chat=debug,warn")
        } else {
            EnvFilter::new("softsell_chat=info,warn")
        }
    })
}

fn setup_file_tracing(log_dir: &Path, verbose: bool) -> Result<()> {
    let (file, log_path) = open_log_file(log_dir)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
    tracing::debug!(path = ?log_path, "tracing initialized");
    Ok(())
}

fn open_log_file(log_dir: &Path) -> Result<(File, PathBuf)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let log_path = log_dir.join("softsell-chat.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    Ok((file, log_path))
}

fn setup_stderr_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}
