mod cmd;
mod directory;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::app::AppSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "permit-sync",
    about = "Synchronize permit applications with the external case-processing registry",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .permit-sync/ or .git/)
    #[arg(long, global = true, env = "PERMIT_SYNC_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the sync workspace in the current project
    Init {
        /// Base URL of the registry API
        #[arg(long)]
        base_url: String,
    },

    /// Manage tracked applications
    App {
        #[command(subcommand)]
        subcommand: AppSubcommand,
    },

    /// Run one reconciliation pass against the registry
    Sync {
        /// Keep running, polling at the configured interval
        #[arg(long)]
        watch: bool,

        /// Override the configured poll interval (only with --watch)
        #[arg(long, requires = "watch")]
        interval_secs: Option<u64>,
    },

    /// List recent status events and their processing state
    Events {
        #[arg(long, default_value = "50")]
        limit: usize,

        /// Show only events whose last processing attempt failed
        #[arg(long)]
        failed: bool,
    },

    /// Show the poll watermark
    Watermark,

    /// Delete processed events past the retention window
    Purge {
        /// Override the configured retention window
        #[arg(long)]
        days: Option<i64>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Sync { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { base_url } => cmd::init::run(&root, &base_url),
        Commands::App { subcommand } => cmd::app::run(&root, subcommand, cli.json),
        Commands::Sync {
            watch,
            interval_secs,
        } => cmd::sync::run(&root, watch, interval_secs),
        Commands::Events { limit, failed } => cmd::events::run(&root, limit, failed, cli.json),
        Commands::Watermark => cmd::events::watermark(&root, cli.json),
        Commands::Purge { days } => cmd::purge::run(&root, days, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
