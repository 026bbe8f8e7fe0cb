//! hostsweep - discover the hostnames behind a set of IP addresses
//!
//! Reverse DNS, TLS certificate names, HTTP redirect headers and
//! dictionary/NS/MX/SRV lookups are run concurrently by a bounded worker
//! pool; results are deduplicated, optionally validated or forward
//! confirmed, then rendered as a table, CSV, clean listing or JSON.

pub mod config;
pub mod engine;
pub mod error;
pub mod network;
pub mod output;
pub mod probes;
pub mod utils;

// Re-export commonly used types
pub use config::ReconConfig;
pub use engine::{BoxedProbe, Probe, ProbeOutcome, ReconEngine, ReconRun, Record, ResultSet};
pub use error::{ProbeError, ReconError, ReconResult};
pub use network::DnsResolver;
pub use output::{OutputConfig, OutputFormat, OutputManager};

pub type Result<T> = std::result::Result<T, ReconError>;
