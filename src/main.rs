//! # linekv - a persistent, transactional key-value store
//!
//! This is the main entry point for the linekv server. It parses the CLI,
//! initializes logging, and runs the HTTP front end over the storage and
//! transaction engines.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

use linekv::server::{LinekvServer, ServerConfig};

/// A persistent, transactional key-value store with a line-oriented text
/// command protocol over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "linekv",
    version,
    about = "A persistent, transactional key-value store",
    long_about = "linekv accepts line-oriented text commands (SET, GET, BEGIN, COMMIT, ROLLBACK) \
                  over HTTP and applies them against a durable single-writer store with per-client \
                  optimistic transactions."
)]
struct Args {
    /// Address to listen on for client traffic.
    #[arg(long, default_value = "127.0.0.1:4400")]
    listen_addr: SocketAddr,

    /// Path to the data directory where linekv stores the store image and
    /// in-flight transaction records.
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Log level - 'trace', 'debug', 'info', 'warn', or 'error'.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_tracing(&args.log_level)?;
    print_startup_banner(&args);

    let config = ServerConfig {
        listen_addr: args.listen_addr,
        data_dir: args.data_dir.clone(),
    };

    let server = LinekvServer::new(config)?;
    let shutdown = setup_signal_handlers();

    info!("Starting linekv server...");
    match server.run(shutdown).await {
        Ok(()) => {
            info!("Server shut down gracefully");
            Ok(())
        }
        Err(e) => {
            error!("Server error: {:?}", e);
            Err(e)
        }
    }
}

/// Initialize the tracing/logging system with the specified log level.
fn initialize_tracing(log_level: &str) -> anyhow::Result<()> {
    let env_filter = match log_level {
        "trace" => EnvFilter::new("trace"),
        "debug" => EnvFilter::new("debug"),
        "info" => EnvFilter::new("info"),
        "warn" => EnvFilter::new("warn"),
        "error" => EnvFilter::new("error"),
        _ => {
            eprintln!("Invalid log level: {}. Using 'info'", log_level);
            EnvFilter::new("info")
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Print the startup banner with version and configuration info.
fn print_startup_banner(args: &Args) {
    let version = env!("CARGO_PKG_VERSION");
    println!("linekv v{}", version);
    println!();
    println!("Configuration:");
    println!("  Listen address:  {}", args.listen_addr);
    println!("  Data directory:  {}", args.data_dir.display());
    println!("  Log level:       {}", args.log_level);
    println!();
}

/// Set up signal handlers for graceful shutdown (SIGTERM, SIGINT).
fn setup_signal_handlers() -> impl std::future::Future<Output = ()> {
    async {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");

        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }
}
