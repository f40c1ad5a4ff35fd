//! Backend driving a live pf firewall through the `pfctl` utility.
//!
//! Runs `pfctl -t <table> -T add|delete|flush` per operation. The daemon is
//! expected to run with enough privilege for pfctl to reach `/dev/pf`.

use crate::{FilterTable, TableError};
use async_trait::async_trait;
use pftabled_wire::TableName;
use std::net::Ipv4Addr;
use tokio::process::Command;
use tracing::debug;

/// pfctl-based filter table implementation
pub struct PfctlTable {
    pfctl: String,
}

impl PfctlTable {
    /// Create a backend using `pfctl` from `PATH`
    pub fn new() -> Self {
        Self::with_program("pfctl")
    }

    /// Create a backend using an explicit pfctl binary
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            pfctl: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<(), TableError> {
        debug!("exec {} {}", self.pfctl, args.join(" "));
        let output = Command::new(&self.pfctl).args(args).output().await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(TableError::Backend(format!(
                "{} {}: {}",
                self.pfctl,
                args.join(" "),
                stderr.trim()
            )))
        }
    }
}

impl Default for PfctlTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FilterTable for PfctlTable {
    async fn add(&self, table: &TableName, addr: Ipv4Addr, mask: u8) -> Result<(), TableError> {
        let name = table.to_string();
        let prefix = format!("{}/{}", addr, mask);
        self.run(&["-t", &name, "-T", "add", &prefix]).await
    }

    async fn remove(&self, table: &TableName, addr: Ipv4Addr, mask: u8) -> Result<(), TableError> {
        let name = table.to_string();
        let prefix = format!("{}/{}", addr, mask);
        self.run(&["-t", &name, "-T", "delete", &prefix]).await
    }

    async fn clear(&self, table: &TableName) -> Result<(), TableError> {
        let name = table.to_string();
        self.run(&["-t", &name, "-T", "flush"]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_an_error_not_a_crash() {
        let backend = PfctlTable::with_program("pfctl-does-not-exist");
        let table = TableName::new("blocked").unwrap();
        let result = backend.add(&table, Ipv4Addr::new(10, 0, 0, 1), 32).await;
        assert!(result.is_err());
    }
}
