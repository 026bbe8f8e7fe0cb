//! DNS lookups against a single configured server

use crate::config::ReconConfig;
use crate::engine::ForwardResolver;
use crate::error::ProbeError;
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Thin wrapper over the hickory resolver
///
/// Every lookup goes to the one server given on the command line; the
/// system resolver configuration is never consulted.
#[derive(Clone)]
pub struct DnsResolver {
    inner: TokioAsyncResolver,
    server: IpAddr,
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver").field("server", &self.server).finish()
    }
}

impl DnsResolver {
    pub fn new(server: IpAddr, timeout: Duration) -> Self {
        let group = NameServerConfigGroup::from_ips_clear(&[server], 53, true);
        let config = ResolverConfig::from_parts(None, vec![], group);

        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;

        Self {
            inner: TokioAsyncResolver::tokio(config, opts),
            server,
        }
    }

    pub fn from_config(config: &ReconConfig) -> crate::Result<Self> {
        let server = config.server_addr()?;
        Ok(Self::new(server, config.timeout_duration().max(Duration::from_secs(1))))
    }

    pub fn server(&self) -> IpAddr {
        self.server
    }

    pub async fn ipv4_addresses(&self, name: &str) -> Result<Vec<Ipv4Addr>, ProbeError> {
        match self.inner.ipv4_lookup(name).await {
            Ok(lookup) => Ok(lookup.iter().map(|a| a.0).collect()),
            Err(err) => empty_on_no_records(err),
        }
    }

    pub async fn ipv6_addresses(&self, name: &str) -> Result<Vec<Ipv6Addr>, ProbeError> {
        match self.inner.ipv6_lookup(name).await {
            Ok(lookup) => Ok(lookup.iter().map(|aaaa| aaaa.0).collect()),
            Err(err) => empty_on_no_records(err),
        }
    }

    /// A records, plus AAAA records when `ipv6` is set
    pub async fn addresses(&self, name: &str, ipv6: bool) -> Result<Vec<IpAddr>, ProbeError> {
        let mut addrs: Vec<IpAddr> =
            self.ipv4_addresses(name).await?.into_iter().map(IpAddr::V4).collect();
        if ipv6 {
            addrs.extend(self.ipv6_addresses(name).await?.into_iter().map(IpAddr::V6));
        }
        Ok(addrs)
    }

    /// Target of the CNAME record for `name`, without the trailing dot
    pub async fn canonical_name(&self, name: &str) -> Result<Option<String>, ProbeError> {
        let lookup = match self.inner.lookup(name, RecordType::CNAME).await {
            Ok(lookup) => lookup,
            Err(err) => return empty_on_no_records(err).map(|_: Vec<()>| None),
        };

        Ok(lookup.iter().find_map(|rdata| match rdata {
            RData::CNAME(cname) => Some(trim_root(&cname.to_string())),
            _ => None,
        }))
    }

    /// PTR names for an address
    pub async fn reverse(&self, ip: IpAddr) -> Result<Vec<String>, ProbeError> {
        let lookup = self.inner.reverse_lookup(ip).await.map_err(dns_error)?;
        Ok(lookup.iter().map(|ptr| trim_root(&ptr.to_string())).collect())
    }

    pub async fn name_servers(&self, domain: &str) -> Result<Vec<String>, ProbeError> {
        let lookup = self.inner.ns_lookup(domain).await.map_err(dns_error)?;
        Ok(lookup.iter().map(|ns| trim_root(&ns.to_string())).collect())
    }

    pub async fn mail_exchangers(&self, domain: &str) -> Result<Vec<String>, ProbeError> {
        let lookup = self.inner.mx_lookup(domain).await.map_err(dns_error)?;
        Ok(lookup.iter().map(|mx| trim_root(&mx.exchange().to_string())).collect())
    }

    /// Targets of the SRV records published under `name`
    pub async fn service_targets(&self, name: &str) -> Result<Vec<String>, ProbeError> {
        let lookup = self.inner.srv_lookup(name).await.map_err(dns_error)?;
        Ok(lookup.iter().map(|srv| trim_root(&srv.target().to_string())).collect())
    }
}

#[async_trait]
impl ForwardResolver for DnsResolver {
    async fn lookup_ipv4(&self, name: &str) -> Result<Option<String>, ProbeError> {
        Ok(self.ipv4_addresses(name).await?.first().map(|ip| ip.to_string()))
    }

    async fn lookup_cname(&self, name: &str) -> Result<Option<String>, ProbeError> {
        self.canonical_name(name).await
    }

    async fn lookup_ipv6(&self, name: &str) -> Result<Option<String>, ProbeError> {
        Ok(self.ipv6_addresses(name).await?.first().map(|ip| ip.to_string()))
    }
}

/// Strip the root label dot hickory puts on fully qualified names
pub fn trim_root(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

fn dns_error(err: ResolveError) -> ProbeError {
    match err.kind() {
        ResolveErrorKind::Timeout => ProbeError::Timeout,
        _ => ProbeError::Dns(err.to_string()),
    }
}

/// A name that exists but has no records of the asked type is not a failure
fn empty_on_no_records<T>(err: ResolveError) -> Result<Vec<T>, ProbeError> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
        _ => Err(dns_error(err)),
    }
}
