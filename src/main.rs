//! snipy: a transparent, name-routed TCP forwarder.
//!
//! Accepts on ports 80 and 443, peeks the client's first bytes to learn the
//! destination hostname (TLS SNI or HTTP Host), dials upstream directly or
//! through a SOCKS5 proxy, then relays bytes bidirectionally.

mod config;
mod dial;
mod error;
mod listener;
mod relay;
mod sniff;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::ConfigError;
use listener::Listener;
use sniff::Protocol;

/// No positional arguments, `--env-file` and `--list-env` only.
/// Unrecognized flags exit non-zero via clap's default behavior.
#[derive(Parser, Debug)]
#[command(name = "snipy", about = "Name-routed TCP forwarder (TLS SNI / HTTP Host)")]
struct Cli {
    /// Load environment variables from this file before reading configuration.
    #[arg(long, value_name = "path")]
    env_file: Option<std::path::PathBuf>,

    /// Print all recognized environment variables with titles, defaults, and types.
    #[arg(long)]
    list_env: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    if let Some(path) = &cli.env_file {
        if let Err(source) = dotenvy::from_path(path) {
            let err = ConfigError::EnvFile {
                path: path.display().to_string(),
                source,
            };
            error!(%err, "configuration error");
            return ExitCode::FAILURE;
        }
    }

    if cli.list_env {
        config::print_env_table();
        return ExitCode::SUCCESS;
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> std::io::Result<()> {
    let config = Arc::new(config);

    let http = Listener::bind(Protocol::Http, Arc::clone(&config)).await?;
    let tls = Listener::bind(Protocol::Tls, Arc::clone(&config)).await?;

    tokio::select! {
        result = http.serve() => result?,
        result = tls.serve() => result?,
        _ = shutdown_signal() => {
            tracing::warn!("shutdown signal received");
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
