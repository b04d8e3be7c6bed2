//! BuckyBall CLI - Main entry point

mod cli;
mod demo;

use bucky_core::Kernel;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// bucky - BuckyBall kernel diagnostics
#[derive(Parser, Debug)]
#[command(name = "bucky")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect and manipulate cache backends
    Cache {
        #[command(subcommand)]
        action: cli::CacheAction,

        /// Backend to use instead of the default (file, apc, memcache, db, shmem)
        #[arg(short, long, global = true)]
        backend: Option<String>,
    },
    /// Class override registry tools
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Subcommand, Debug)]
enum RegistryAction {
    /// Bootstrap two sample modules and print the results with the registry dump
    Demo,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    debug!(command = ?args.command, "bucky starting");

    let kernel = Kernel::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        Kernel::default()
    });

    match args.command {
        Command::Cache { action, backend } => cli::run_cache(&kernel, backend.as_deref(), action),
        Command::Registry {
            action: RegistryAction::Demo,
        } => demo::run(&kernel),
    }
}
