//! In-memory table backend for development and testing

use crate::{FilterTable, TableError};
use async_trait::async_trait;
use dashmap::DashMap;
use pftabled_wire::TableName;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use tracing::debug;

/// In-memory filter table implementation.
///
/// Each table is an independent set of `(address, prefix)` pairs. Removing
/// an absent entry and flushing an absent table both succeed, matching pf's
/// idempotent table semantics.
#[derive(Default)]
pub struct MemoryTable {
    tables: DashMap<TableName, BTreeSet<(Ipv4Addr, u8)>>,
}

impl MemoryTable {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the entries of one table, in address order
    pub fn entries(&self, table: &TableName) -> Vec<(Ipv4Addr, u8)> {
        self.tables
            .get(table)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of entries in one table
    pub fn len(&self, table: &TableName) -> usize {
        self.tables.get(table).map(|set| set.len()).unwrap_or(0)
    }

    /// Whether a table has no entries
    pub fn is_empty(&self, table: &TableName) -> bool {
        self.len(table) == 0
    }
}

#[async_trait]
impl FilterTable for MemoryTable {
    async fn add(&self, table: &TableName, addr: Ipv4Addr, mask: u8) -> Result<(), TableError> {
        debug!("mem add <{}> {}/{}", table, addr, mask);
        self.tables.entry(*table).or_default().insert((addr, mask));
        Ok(())
    }

    async fn remove(&self, table: &TableName, addr: Ipv4Addr, mask: u8) -> Result<(), TableError> {
        debug!("mem del <{}> {}/{}", table, addr, mask);
        if let Some(mut set) = self.tables.get_mut(table) {
            set.remove(&(addr, mask));
        }
        Ok(())
    }

    async fn clear(&self, table: &TableName) -> Result<(), TableError> {
        debug!("mem flush <{}>", table);
        if let Some(mut set) = self.tables.get_mut(table) {
            set.clear();
        }
        Ok(())
    }
}
