//! Error handling for hostsweep
//!
//! Two layers of errors exist. [`ReconError`] covers everything that can stop
//! a run (bad targets, unreadable files, broken configuration). [`ProbeError`]
//! describes a single probe that could not complete; those never leave the
//! worker pool except through debug logging.

use thiserror::Error;

/// Main error type for reconnaissance runs
#[derive(Debug, Error)]
pub enum ReconError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("DNS error: {0}")]
    DnsError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}

impl From<serde_json::Error> for ReconError {
    fn from(err: serde_json::Error) -> Self {
        ReconError::ParseError(err.to_string())
    }
}

/// Failure of a single probe
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("dns lookup failed: {0}")]
    Dns(String),

    #[error("tls handshake failed: {0}")]
    Tls(String),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("timed out")]
    Timeout,

    #[error("io error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => ProbeError::Timeout,
            _ => ProbeError::Io(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout
        } else {
            ProbeError::Http(err.to_string())
        }
    }
}

impl From<openssl::error::ErrorStack> for ProbeError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        ProbeError::Tls(err.to_string())
    }
}

/// Result type alias for reconnaissance operations
pub type ReconResult<T> = Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_timeout_maps_to_probe_timeout() {
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert_eq!(ProbeError::from(err), ProbeError::Timeout);
    }

    #[test]
    fn test_error_messages() {
        let err = ReconError::InvalidTarget("\"nope\" is not an IP Address or CIDR Network".into());
        assert!(err.to_string().starts_with("Invalid target:"));
        assert_eq!(ProbeError::Timeout.to_string(), "timed out");
    }
}
