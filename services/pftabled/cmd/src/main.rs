//! pftabled daemon binary.
//!
//! Listens on a UDP socket for authenticated control messages and applies
//! them to a packet filter table backend. One datagram carries one command
//! (add, del or flush); nothing is ever sent back. With an entry timeout
//! configured, added addresses are removed again automatically once the
//! timeout elapses.

use clap::Parser;
use pftabled_table::{open_backend, BackendMode};
use pftabled_wire::{unix_now, TableName};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod dispatch;

use config::{load_key, DaemonConfig};
use dispatch::{DispatchError, Dispatcher, DispatcherConfig, RejectReason};

/// How long the receive call waits before the loop wakes to drain expired
/// entries, when entry timeouts are enabled.
const DRAIN_TICK: Duration = Duration::from_secs(1);

/// UDP-controlled pf table daemon
#[derive(Parser, Debug)]
#[command(name = "pftabled", version, about = "UDP-controlled pf table daemon")]
struct Args {
    /// Bind to this address (default: 0.0.0.0)
    #[arg(short = 'a', long)]
    address: Option<IpAddr>,

    /// Bind to this port (default: 56789)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Force requests to use this table
    #[arg(short = 'f', long)]
    table: Option<String>,

    /// Read the authentication key from this file
    #[arg(short = 'k', long)]
    key_file: Option<PathBuf>,

    /// Remove added entries after this long, e.g. 60s or 10m
    #[arg(short = 't', long)]
    timeout: Option<humantime::Duration>,

    /// Filter table backend: memory or pfctl
    #[arg(long)]
    backend: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Configuration file path
    #[arg(long, default_value = "pftabled.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("info")
        .add_directive(format!("pftabled={}", args.log_level).parse()?)
        .add_directive(format!("pftabled_wire={}", args.log_level).parse()?)
        .add_directive(format!("pftabled_table={}", args.log_level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!("Starting pftabled v{}", env!("CARGO_PKG_VERSION"));

    // Defaults, then config file and environment, then CLI flags on top
    let mut config = DaemonConfig::load_from_file(&args.config)?;
    if let Some(address) = args.address {
        config.listen = address.to_string();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(table) = args.table {
        config.table = Some(table);
    }
    if let Some(key_file) = args.key_file {
        config.key_file = Some(key_file.to_string_lossy().to_string());
    }
    if let Some(timeout) = args.timeout {
        config.timeout = Some(timeout.as_secs());
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }

    let forced_table = config
        .table
        .as_deref()
        .map(TableName::new)
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid forced table: {}", e))?;

    let key = config.key_file.as_deref().map(load_key).transpose()?;
    if key.is_some() {
        info!("Authentication enabled");
    } else {
        warn!("Running without authentication; anyone who can reach the socket can send commands");
    }

    let backend_mode = match config.backend.as_str() {
        "memory" => BackendMode::Memory,
        "pfctl" => BackendMode::Pfctl,
        other => anyhow::bail!("invalid backend: {}. Use 'memory' or 'pfctl'", other),
    };

    let entry_timeout = config.timeout.filter(|&t| t > 0);
    match entry_timeout {
        Some(secs) => info!("Entries expire after {}s", secs),
        None => info!("Entry timeouts disabled"),
    }

    let socket = UdpSocket::bind((config.listen.as_str(), config.port)).await?;
    info!("Listening on {}", socket.local_addr()?);

    let mut dispatcher = Dispatcher::new(
        DispatcherConfig {
            key,
            forced_table,
            entry_timeout,
            max_clock_skew: config.max_clock_skew,
        },
        open_backend(backend_mode),
    );

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    // One datagram at a time: receive, drain expired entries, validate,
    // dispatch. With a timeout configured the receive call wakes at least
    // once per DRAIN_TICK so expiry keeps running without traffic.
    let mut buf = [0u8; 512];
    loop {
        let received = tokio::select! {
            _ = sigterm.recv() => break,
            _ = sigint.recv() => break,
            received = recv_step(&socket, &mut buf, entry_timeout.is_some()) => received?,
        };

        let now = unix_now();
        dispatcher.drain_expired(u64::from(now)).await;

        let Some((len, peer)) = received else {
            continue; // receive timeout, drain-only wakeup
        };

        match dispatcher.handle_datagram(&buf[..len], now).await {
            Ok(()) => {}
            Err(DispatchError::Reject(RejectReason::Auth)) => {
                warn!("dropped datagram from {}: wrong authentication", peer);
            }
            Err(DispatchError::Reject(reason)) => {
                debug!("dropped datagram from {}: {}", peer, reason);
            }
            Err(e @ DispatchError::Backend { .. }) => {
                error!("{}", e);
            }
        }
    }

    info!("pftabled shutting down");
    Ok(())
}

/// Wait for one datagram, or `None` on a drain tick when timeouts are in use
async fn recv_step(
    socket: &UdpSocket,
    buf: &mut [u8],
    bounded: bool,
) -> std::io::Result<Option<(usize, std::net::SocketAddr)>> {
    if bounded {
        match tokio::time::timeout(DRAIN_TICK, socket.recv_from(buf)).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    } else {
        socket.recv_from(buf).await.map(Some)
    }
}
