//! Filter table backends and expiry tracking for pftabled.
//!
//! The daemon treats the packet filter's address tables as an opaque
//! collaborator: a named set supporting add, remove and flush. This crate
//! defines that seam as the [`FilterTable`] trait with pluggable backends
//! (in-memory for development and tests, `pfctl` for a live firewall), plus
//! the [`ExpiryQueue`] that tracks pending automatic removals.
//!
//! A failed backend call is an ordinary typed error returned to the caller;
//! the daemon logs it and keeps serving. This intentionally differs from the
//! classic pftabled behavior of terminating the whole process on the first
//! table ioctl failure.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod expiry;

use async_trait::async_trait;
use pftabled_wire::TableName;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Backend errors
#[derive(Error, Debug)]
pub enum TableError {
    /// I/O error talking to the backend
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Backend-specific failure
    #[error("backend error: {0}")]
    Backend(String),
}

/// A named, externally persisted set of addresses/prefixes used for
/// filtering decisions.
///
/// Implementations are free to interpret `mask` as a CIDR prefix length;
/// callers always supply addresses with their host bits already cleared.
#[async_trait]
pub trait FilterTable: Send + Sync {
    /// Add an address/prefix to a table
    async fn add(&self, table: &TableName, addr: Ipv4Addr, mask: u8) -> Result<(), TableError>;

    /// Remove an address/prefix from a table
    async fn remove(&self, table: &TableName, addr: Ipv4Addr, mask: u8) -> Result<(), TableError>;

    /// Remove every address from a table
    async fn clear(&self, table: &TableName) -> Result<(), TableError>;
}

/// Backend selection, fixed at start-up
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendMode {
    /// In-process sets (dev/tests only)
    #[default]
    Memory,
    /// Drive a live pf firewall through the `pfctl` utility
    Pfctl,
}

pub use backend::mem::MemoryTable;
pub use backend::pfctl::PfctlTable;
pub use expiry::{ExpiryEntry, ExpiryQueue};

/// Create a backend from its configured mode
pub fn open_backend(mode: BackendMode) -> std::sync::Arc<dyn FilterTable> {
    match mode {
        BackendMode::Memory => std::sync::Arc::new(MemoryTable::new()),
        BackendMode::Pfctl => std::sync::Arc::new(PfctlTable::new()),
    }
}
