//! Per-datagram validation pipeline and command dispatch.
//!
//! Every inbound datagram runs through the same fixed sequence: size and
//! structural decode, version check, legacy mask normalization, freshness
//! check, authentication, then dispatch to the backend. Any failed step is
//! terminal for that datagram and nothing is ever sent back to the sender,
//! so rejected traffic cannot probe the daemon for hints.
//!
//! Backend failures are returned to the loop as typed errors; the daemon
//! logs them and keeps serving. The historic pftabled treated a failed
//! table ioctl as fatal to the whole process; this implementation
//! deliberately does not.

use pftabled_table::{ExpiryEntry, ExpiryQueue, FilterTable, TableError};
use pftabled_wire::{
    auth, clean_mask, is_fresh, AuthKey, Command, ControlMessage, TableName, WireError, SIGNED_LEN,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Why a datagram was dropped.
///
/// The auth variant intentionally carries no detail about which part of the
/// message failed verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RejectReason {
    /// Datagram length does not match the fixed message size
    #[error("short or oversized datagram ({0} bytes)")]
    Transport(usize),
    /// Protocol version newer than we speak, or below the oldest supported
    #[error("wrong protocol version {0}")]
    Version(u8),
    /// Unknown command code
    #[error("unknown command {0}")]
    Command(u8),
    /// Prefix length outside 1..=32 on an Add/Remove
    #[error("mask out of range: {0}")]
    Mask(u8),
    /// Timestamp outside the clock-skew window
    #[error("timestamp too old")]
    Stale,
    /// Authentication tag mismatch
    #[error("wrong authentication")]
    Auth,
}

/// Outcome of handling one datagram
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The datagram was dropped before reaching the backend
    #[error("dropped: {0}")]
    Reject(#[from] RejectReason),
    /// The backend operation failed; the daemon continues with the next
    /// datagram
    #[error("backend {op} failed: {source}")]
    Backend {
        /// Which table operation failed
        op: &'static str,
        /// Underlying backend error
        #[source]
        source: TableError,
    },
}

/// Process-wide dispatcher settings, fixed at start-up
pub struct DispatcherConfig {
    /// Shared authentication key; `None` disables verification
    pub key: Option<AuthKey>,
    /// When set, every request operates on this table regardless of the
    /// table named in the message
    pub forced_table: Option<TableName>,
    /// Seconds after which added entries are removed again; `None` disables
    /// entry timeouts
    pub entry_timeout: Option<u64>,
    /// Maximum accepted clock difference in seconds
    pub max_clock_skew: u32,
}

/// Validates inbound messages end-to-end and applies them to the backend
pub struct Dispatcher {
    config: DispatcherConfig,
    backend: Arc<dyn FilterTable>,
    queue: ExpiryQueue,
}

impl Dispatcher {
    /// Create a dispatcher over a backend
    pub fn new(config: DispatcherConfig, backend: Arc<dyn FilterTable>) -> Self {
        Self {
            config,
            backend,
            queue: ExpiryQueue::new(),
        }
    }

    /// Number of entries awaiting automatic removal
    pub fn pending_expirations(&self) -> usize {
        self.queue.len()
    }

    /// Run one datagram through the validation pipeline and, if it passes,
    /// apply its command to the backend.
    pub async fn handle_datagram(
        &mut self,
        datagram: &[u8],
        now: u32,
    ) -> Result<(), DispatchError> {
        let (mut msg, tag) = ControlMessage::decode(datagram).map_err(|e| match e {
            WireError::Length(n) => RejectReason::Transport(n),
            WireError::Version(v) => RejectReason::Version(v),
            WireError::Command(c) => RejectReason::Command(c),
            _ => RejectReason::Transport(datagram.len()),
        })?;

        msg.normalize();

        if !is_fresh(msg.timestamp, now, self.config.max_clock_skew) {
            return Err(RejectReason::Stale.into());
        }

        if let Some(key) = &self.config.key {
            // the tag covers the wire bytes, so verify against the raw
            // datagram rather than a re-encoding
            if !auth::verify(key, &datagram[..SIGNED_LEN], &tag) {
                return Err(RejectReason::Auth.into());
            }
        }

        let table = self.config.forced_table.unwrap_or(msg.table);

        match msg.command {
            Command::Add => {
                if !(1..=32).contains(&msg.mask) {
                    return Err(RejectReason::Mask(msg.mask).into());
                }
                let addr = clean_mask(msg.addr, msg.mask);
                self.backend
                    .add(&table, addr, msg.mask)
                    .await
                    .map_err(|source| DispatchError::Backend { op: "add", source })?;
                info!("<{}> add {}/{}", table, addr, msg.mask);

                if let Some(timeout) = self.config.entry_timeout {
                    self.queue.schedule(ExpiryEntry {
                        table,
                        addr,
                        mask: msg.mask,
                        expires_at: u64::from(now) + timeout,
                    });
                }
            }
            Command::Remove => {
                if !(1..=32).contains(&msg.mask) {
                    return Err(RejectReason::Mask(msg.mask).into());
                }
                let addr = clean_mask(msg.addr, msg.mask);
                self.backend
                    .remove(&table, addr, msg.mask)
                    .await
                    .map_err(|source| DispatchError::Backend { op: "del", source })?;
                info!("<{}> del {}/{}", table, addr, msg.mask);
            }
            Command::Flush => {
                self.backend
                    .clear(&table)
                    .await
                    .map_err(|source| DispatchError::Backend { op: "flush", source })?;
                info!("<{}> flush", table);
            }
        }

        Ok(())
    }

    /// Remove every entry whose deadline has passed.
    ///
    /// A removal that was already applied manually is not reconciled here:
    /// the queue does not learn about Remove commands, so the timed removal
    /// still fires (harmlessly, removals are idempotent) even if the entry
    /// was taken out or re-added in the meantime.
    pub async fn drain_expired(&mut self, now: u64) {
        for entry in self.queue.drain(now) {
            match self
                .backend
                .remove(&entry.table, entry.addr, entry.mask)
                .await
            {
                Ok(()) => info!("<{}> timeout {}/{}", entry.table, entry.addr, entry.mask),
                Err(e) => debug!(
                    "timed removal of {}/{} from <{}> failed: {}",
                    entry.addr, entry.mask, entry.table, e
                ),
            }
        }
    }
}
