//! Configuration module for hostsweep

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Settings consumed by the reconnaissance engine and the DNS layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Number of concurrent workers, also the task and result queue capacity
    pub concurrency: usize,

    /// Socket timeout for each probe in milliseconds
    pub timeout: u64,

    /// DNS server used by every lookup
    pub server: String,

    /// Log probe failures and successes
    pub debug: bool,

    /// Drop records whose hostname is not a valid domain name
    pub validate: bool,

    /// Replace records with forward-confirmed ones
    pub fcrdns: bool,

    /// Look for AAAA records where applicable
    pub ipv6: bool,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            concurrency: 100,
            timeout: 500,
            server: "8.8.8.8".to_string(),
            debug: false,
            validate: false,
            fcrdns: false,
            ipv6: false,
        }
    }
}

impl ReconConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the probe timeout in milliseconds
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the DNS server address
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_fcrdns(mut self, fcrdns: bool) -> Self {
        self.fcrdns = fcrdns;
        self
    }

    pub fn with_ipv6(mut self, ipv6: bool) -> Self {
        self.ipv6 = ipv6;
        self
    }

    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Parsed DNS server address
    pub fn server_addr(&self) -> crate::Result<IpAddr> {
        self.server.parse::<IpAddr>().map_err(|_| {
            crate::ReconError::ConfigError(format!(
                "DNS server \"{}\" is not an IP address",
                self.server
            ))
        })
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::ReconError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: ReconConfig = toml::from_str(&content)
            .map_err(|e| crate::ReconError::ConfigError(format!("Failed to parse TOML: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from ~/.hostsweep.toml, falling back to defaults
    pub fn load_default_config() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let config_path = home_dir.join(".hostsweep.toml");

        if config_path.exists() {
            match Self::from_toml_file(&config_path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.concurrency == 0 {
            return Err(crate::ReconError::ConfigError(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        if self.timeout == 0 {
            return Err(crate::ReconError::ConfigError(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        self.server_addr()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ReconConfig::default();
        assert_eq!(config.concurrency, 100);
        assert_eq!(config.timeout_duration(), Duration::from_millis(500));
        assert_eq!(config.server, "8.8.8.8");
        assert!(!config.fcrdns && !config.validate && !config.ipv6 && !config.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ReconConfig::new().with_concurrency(0).validate().is_err());
        assert!(ReconConfig::new().with_timeout(0).validate().is_err());
        assert!(ReconConfig::new().with_server("dns.example").validate().is_err());
        assert!(ReconConfig::new().with_server("2001:4860:4860::8888").validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "concurrency = 12\nfcrdns = true\nserver = \"1.1.1.1\"").unwrap();

        let config = ReconConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.concurrency, 12);
        assert!(config.fcrdns);
        assert_eq!(config.server, "1.1.1.1");
        assert_eq!(config.timeout, 500);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "concurrency = \"lots\"").unwrap();

        let err = ReconConfig::from_toml_file(file.path()).unwrap_err();
        assert!(matches!(err, crate::ReconError::ConfigError(_)));
    }
}
