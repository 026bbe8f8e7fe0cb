//! Network plumbing shared by the probes

pub mod resolver;

pub use resolver::{trim_root, DnsResolver};

use std::net::IpAddr;

/// Format an address for use as a URL host, bracketing IPv6
pub fn url_host(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{}]", v6),
    }
}
