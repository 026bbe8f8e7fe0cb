//! Expansion of IP addresses and CIDR networks into host lists

use anyhow::{anyhow, Result};
use ipnetwork::IpNetwork;
use std::collections::HashSet;
use std::net::IpAddr;
use std::str::FromStr;

/// Largest network that will be expanded (a /8 in IPv4 terms)
pub const MAX_NETWORK_SIZE: u128 = 1 << 24;

/// Address parser for IP and CIDR inputs
#[derive(Debug, Clone)]
pub struct AddressParser {
    max_network_size: u128,
}

impl Default for AddressParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressParser {
    pub fn new() -> Self {
        Self {
            max_network_size: MAX_NETWORK_SIZE,
        }
    }

    /// Limit how many addresses a single CIDR may expand to
    pub fn with_max_network_size(mut self, max: u128) -> Self {
        self.max_network_size = max;
        self
    }

    /// Expand every line into addresses, keeping first-seen order
    ///
    /// Any line that is neither an address nor a network fails the whole
    /// call; partial target lists are never returned.
    pub fn parse_addresses<S: AsRef<str>>(&self, lines: &[S]) -> Result<Vec<IpAddr>> {
        let mut all_ips = Vec::new();
        for line in lines {
            all_ips.extend(self.parse_single_address(line.as_ref().trim())?);
        }

        let mut seen = HashSet::new();
        all_ips.retain(|ip| seen.insert(*ip));

        log::info!("Parsed {} unique addresses", all_ips.len());
        Ok(all_ips)
    }

    /// Parse a single address or network
    pub fn parse_single_address(&self, address: &str) -> Result<Vec<IpAddr>> {
        if let Ok(ip) = IpAddr::from_str(address) {
            return Ok(vec![ip]);
        }

        if address.contains('/') {
            if let Ok(network) = IpNetwork::from_str(address) {
                return self.expand_network(address, network);
            }
        }

        Err(anyhow!("\"{}\" is not an IP Address or CIDR Network", address))
    }

    fn expand_network(&self, address: &str, network: IpNetwork) -> Result<Vec<IpAddr>> {
        let size: u128 = match network {
            IpNetwork::V4(net) => u128::from(net.size()),
            IpNetwork::V6(net) => net.size(),
        };
        if size > self.max_network_size {
            return Err(anyhow!(
                "\"{}\" expands to {} addresses, more than the limit of {}",
                address,
                size,
                self.max_network_size
            ));
        }

        // Host bits in the input are ignored: 10.0.0.7/30 means 10.0.0.4/30.
        let ips: Vec<IpAddr> = match network {
            IpNetwork::V4(net) => net.iter().map(IpAddr::V4).collect(),
            IpNetwork::V6(net) => net.iter().map(IpAddr::V6).collect(),
        };
        log::debug!("CIDR {} expanded to {} addresses", address, ips.len());
        Ok(ips)
    }
}

/// Convenience function for quick address parsing
pub fn parse_addresses_simple<S: AsRef<str>>(lines: &[S]) -> Result<Vec<IpAddr>> {
    AddressParser::new().parse_addresses(lines)
}
