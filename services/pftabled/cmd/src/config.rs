//! Configuration handling for the pftabled daemon.
//!
//! Settings come from three layers, lowest precedence first: built-in
//! defaults, an optional YAML config file, and `PFTABLED_*` environment
//! variables. Command-line flags are applied on top by `main`.

use anyhow::{Context, Result};
use pftabled_wire::{AuthKey, AUTH_KEY_SIZE, MAX_CLOCK_SKEW_SECS};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Daemon configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Address to bind the UDP socket to
    pub listen: String,
    /// Port to bind to
    pub port: u16,
    /// Force all requests into this table instead of the one named in the
    /// message
    pub table: Option<String>,
    /// Path to the shared authentication key file; unset disables
    /// authentication
    pub key_file: Option<String>,
    /// Remove added entries after this many seconds; unset disables entry
    /// timeouts
    pub timeout: Option<u64>,
    /// Maximum accepted clock difference in seconds between sender and
    /// daemon
    pub max_clock_skew: u32,
    /// Filter table backend: `memory` or `pfctl`
    pub backend: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0".to_string(),
            port: 56789,
            table: None,
            key_file: None,
            timeout: None,
            max_clock_skew: MAX_CLOCK_SKEW_SECS,
            backend: "pfctl".to_string(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a YAML file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                config = serde_yaml::from_str(&content).with_context(|| {
                    format!("failed to parse config file {:?}", config_path.as_ref())
                })?;
                info!("Loaded configuration from {:?}", config_path.as_ref());
            }
            Err(_) => {
                warn!(
                    "Config file {:?} not found, using defaults",
                    config_path.as_ref()
                );
            }
        }

        config.apply_environment_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_environment_overrides(&mut self) {
        if let Ok(listen) = std::env::var("PFTABLED_LISTEN") {
            self.listen = listen;
            info!("Listen address overridden by environment: {}", self.listen);
        }

        if let Ok(port) = std::env::var("PFTABLED_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.port = port;
                info!("Port overridden by environment: {}", port);
            }
        }

        if let Ok(table) = std::env::var("PFTABLED_TABLE") {
            self.table = Some(table);
        }

        if let Ok(key_file) = std::env::var("PFTABLED_KEY_FILE") {
            self.key_file = Some(key_file);
        }

        if let Ok(timeout) = std::env::var("PFTABLED_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.timeout = Some(secs);
                info!("Entry timeout overridden by environment: {}s", secs);
            }
        }

        if let Ok(backend) = std::env::var("PFTABLED_BACKEND") {
            self.backend = backend;
        }
    }
}

/// Read the shared authentication key from a file.
///
/// The file must hold at least [`AUTH_KEY_SIZE`] bytes; only the first
/// [`AUTH_KEY_SIZE`] are used, so trailing newlines are harmless.
pub fn load_key<P: AsRef<Path>>(path: P) -> Result<AuthKey> {
    let raw = std::fs::read(&path)
        .with_context(|| format!("unable to read key file {:?}", path.as_ref()))?;
    if raw.len() < AUTH_KEY_SIZE {
        anyhow::bail!(
            "key file {:?} holds {} bytes, need {}",
            path.as_ref(),
            raw.len(),
            AUTH_KEY_SIZE
        );
    }
    AuthKey::from_slice(&raw[..AUTH_KEY_SIZE]).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.listen, "0.0.0.0");
        assert_eq!(config.port, 56789);
        assert_eq!(config.max_clock_skew, 60);
        assert!(config.table.is_none());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let yaml_content = r#"
listen: 127.0.0.1
port: 50000
table: blocked
timeout: 300
max_clock_skew: 30
backend: memory
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = DaemonConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(config.listen, "127.0.0.1");
        assert_eq!(config.port, 50000);
        assert_eq!(config.table.as_deref(), Some("blocked"));
        assert_eq!(config.timeout, Some(300));
        assert_eq!(config.max_clock_skew, 30);
        assert_eq!(config.backend, "memory");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = DaemonConfig::load_from_file("/nonexistent/pftabled.yaml").unwrap();
        assert_eq!(config.port, 56789);
    }

    #[test]
    fn test_load_key() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0x42u8; AUTH_KEY_SIZE]).unwrap();
        temp_file.write_all(b"\n").unwrap(); // trailing newline ignored

        let key = load_key(temp_file.path()).unwrap();
        assert_eq!(key.as_bytes(), &[0x42u8; AUTH_KEY_SIZE]);
    }

    #[test]
    fn test_load_key_rejects_short_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0x42u8; 8]).unwrap();
        assert!(load_key(temp_file.path()).is_err());
    }
}
