use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;

use gator::commands::{CommandRegistry, Session};
use gator::config::Config;
use gator::feed::FeedFetcher;
use gator::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(
    name = "gator",
    about = "Command-line RSS feed aggregator",
    after_help = "Run `gator help` for the list of commands."
)]
struct Args {
    /// Config file (defaults to ~/.gatorconfig.json)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Command to run (`gator help` lists them)
    command: String,

    /// Arguments passed to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let location = config.database_location(&config_path);
    let db = match Database::open(&location).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            println!("{}", DatabaseError::InstanceLocked);
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database {}: {}", location, e)),
    };

    let fetcher =
        FeedFetcher::new(config.request_timeout()).context("Failed to build HTTP client")?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let mut session = Session::new(db, config, config_path, fetcher, stop_rx);
    let registry = CommandRegistry::with_defaults();

    if let Err(e) = registry.run(&mut session, &args.command, &args.args).await {
        println!("{e}");
        std::process::exit(1);
    }
    Ok(())
}

/// Resolves on SIGINT or SIGTERM (Ctrl-C elsewhere).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!(error = %e, "Failed to install signal handlers");
                    std::future::pending::<()>().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down gracefully"),
            _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down gracefully"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
