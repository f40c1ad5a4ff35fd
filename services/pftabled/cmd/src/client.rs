//! pftabled client binary.
//!
//! Builds one signed control message and sends it to a pftabled daemon as a
//! single UDP datagram. The protocol is fire-and-forget: there is no
//! acknowledgement, so a zero exit status only means the datagram left this
//! host.

use anyhow::{bail, Context};
use clap::Parser;
use pftabled_wire::{build_request, AuthKey, Command, TableName, AUTH_KEY_SIZE};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tokio::net::UdpSocket;

/// Send one command to a pftabled daemon
#[derive(Parser, Debug)]
#[command(
    name = "pftabled-client",
    version,
    about = "Send add/del/flush commands to a pftabled daemon"
)]
struct Args {
    /// Read the authentication key from this file
    #[arg(short = 'k', long)]
    key_file: Option<PathBuf>,

    /// Host where pftabled is running
    host: String,

    /// Port number at host
    port: u16,

    /// Name of the table
    table: String,

    /// One of: add, del or flush
    command: String,

    /// IP or network to add or delete, e.g. 10.0.0.1 or 10.0.0.0/24
    target: Option<String>,
}

fn parse_target(target: &str) -> anyhow::Result<(Ipv4Addr, u8)> {
    let (addr, mask) = match target.split_once('/') {
        Some((addr, mask)) => {
            let mask: u8 = mask
                .parse()
                .with_context(|| format!("invalid network mask '{}'", mask))?;
            if !(1..=32).contains(&mask) {
                bail!("invalid network mask '{}'", mask);
            }
            (addr, mask)
        }
        None => (target, 32),
    };
    let addr: Ipv4Addr = addr
        .parse()
        .with_context(|| format!("unable to parse '{}'", addr))?;
    Ok((addr, mask))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let command = match args.command.as_str() {
        "add" => Command::Add,
        "del" => Command::Remove,
        "flush" => Command::Flush,
        other => bail!("unknown command '{}'", other),
    };

    let table = TableName::new(&args.table)
        .map_err(|e| anyhow::anyhow!("table name '{}': {}", args.table, e))?;

    let (addr, mask) = match (command, args.target.as_deref()) {
        (Command::Flush, _) => (Ipv4Addr::UNSPECIFIED, 0),
        (_, Some(target)) => parse_target(target)?,
        (_, None) => bail!("'{}' needs an ip[/mask] argument", args.command),
    };

    let key = match args.key_file {
        Some(path) => {
            let raw = std::fs::read(&path)
                .with_context(|| format!("unable to read key file {:?}", path))?;
            if raw.len() < AUTH_KEY_SIZE {
                bail!("key file {:?} holds fewer than {} bytes", path, AUTH_KEY_SIZE);
            }
            Some(AuthKey::from_slice(&raw[..AUTH_KEY_SIZE])?)
        }
        None => None,
    };

    let datagram = build_request(command, table, addr, mask, key.as_ref())?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket
        .send_to(&datagram, (args.host.as_str(), args.port))
        .await
        .with_context(|| format!("unable to send to {}:{}", args.host, args.port))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target("10.0.0.1").unwrap(),
            (Ipv4Addr::new(10, 0, 0, 1), 32)
        );
        assert_eq!(
            parse_target("10.0.0.0/24").unwrap(),
            (Ipv4Addr::new(10, 0, 0, 0), 24)
        );
        assert!(parse_target("10.0.0.0/0").is_err());
        assert!(parse_target("10.0.0.0/33").is_err());
        assert!(parse_target("not-an-ip").is_err());
    }
}
