//! Command-line entry point for the `nttyd` binary.
//!
//! # Usage
//!
//! ```bash
//! # Relay stdin to every client of port 4000
//! tail -f /var/log/syslog | nttyd 4000
//!
//! # Enable debug logging
//! RUST_LOG=nttyd=debug nttyd 4000
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Stop accepting and broadcasting, then exit

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{RelayConfig, DEFAULT_BACKLOG, DEFAULT_WRITE_TIMEOUT};
use crate::relay::run_relay;

/// Grace period for runtime shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

/// Log filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "nttyd=info,ntty_core=info";

/// ntty daemon - broadcast stdin lines to every connected TCP client
#[derive(Parser, Debug)]
#[command(name = "nttyd", version, about)]
pub struct Args {
    /// TCP port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Address to bind
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Listen backlog for connections not yet accepted
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    pub backlog: u32,

    /// Seconds a client write may take before the client is dropped
    #[arg(long, default_value_t = DEFAULT_WRITE_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub write_timeout_secs: u64,

    /// Skip input lines longer than this many bytes (default: no limit)
    #[arg(long)]
    pub max_line_bytes: Option<NonZeroUsize>,
}

impl Args {
    /// Builds the relay configuration from parsed arguments.
    pub fn to_config(&self) -> RelayConfig {
        RelayConfig {
            bind_addr: SocketAddr::new(self.bind, self.port),
            backlog: self.backlog,
            write_timeout: Duration::from_secs(self.write_timeout_secs),
            max_line_bytes: self.max_line_bytes.map(NonZeroUsize::get),
        }
    }
}

/// Parses arguments, sets up logging and runs the relay on stdin.
///
/// Invalid arguments print usage and exit with a non-zero status.
pub fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        ))
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_with(args.to_config()));

    // A stdin read still parked on a blocking thread must not hold up exit.
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);

    result
}

/// Builds the log filter from `RUST_LOG`, falling back to the defaults.
fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn run_with(config: RelayConfig) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.bind_addr,
        "nttyd starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    if let Err(e) = run_relay(config, tokio::io::stdin(), cancel_token).await {
        error!(error = %e, "Relay error");
        return Err(e.into());
    }

    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
