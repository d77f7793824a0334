//! brig - command-line client for the Brigade API
//!
//! Main entry point for the brig CLI.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{context, get, login, logout, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// brig - command-line client for the Brigade API
#[derive(Parser)]
#[command(name = "brig")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// API server address; bypasses the configured context
    #[arg(long, global = true, env = "BRIGADE_SERVER")]
    pub server: Option<String>,

    /// Bearer token; overrides the context's credentials
    #[arg(long, global = true, env = "BRIGADE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Skip TLS certificate validation
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Context to use instead of the current one
    #[arg(long, global = true)]
    pub context: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a session and store its token
    Login(login::LoginArgs),

    /// Delete the current session and forget its token
    Logout(logout::LogoutArgs),

    /// Fetch a resource or list by path
    Get(get::GetArgs),

    /// Watch an event stream until it completes
    Watch(watch::WatchArgs),

    /// Manage connection contexts
    Context(context::ContextArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Human-readable stderr plus a daily rolling JSON file under the config dir.
///
/// When the log directory cannot be created only the stderr layer is
/// installed. The returned guard flushes the file writer on drop.
fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    let filter = if verbose {
        "brig=debug,brigade_sdk=debug,brigade_config=debug,warn"
    } else {
        "brig=info,brigade_sdk=warn,warn"
    };

    let log_dir = brigade_config::config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let (file_layer, guard, file_error) = match log_file(&log_dir) {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "brig=trace,brigade_sdk=trace,brigade_config=trace,info",
                ));
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
                ),
        )
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        tracing::warn!(dir = %log_dir.display(), error = %e, "File logging disabled");
    }
    guard
}

fn log_file(dir: &Path) -> std::result::Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("brig.log")
        .build(dir)
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_tracing(cli.verbose);

    let ctx = commands::Context {
        server: cli.server,
        token: cli.token,
        insecure: cli.insecure,
        context_name: cli.context,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Login(args) => login::run(args, &ctx).await,
        Commands::Logout(args) => logout::run(args, &ctx).await,
        Commands::Get(args) => get::run(args, &ctx).await,
        Commands::Watch(args) => watch::run(args, &ctx).await,
        Commands::Context(args) => context::run(args, &ctx).await,
    }
}
