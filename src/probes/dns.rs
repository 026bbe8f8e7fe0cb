//! Probes answered purely from DNS

use crate::engine::{Probe, ProbeOutcome, Record};
use crate::error::ProbeError;
use crate::network::DnsResolver;
use async_trait::async_trait;
use futures::future::join_all;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::net::IpAddr;
use std::sync::Arc;

/// Service names tried by the SRV probe
pub const SRV_NAMES: &[&str] = &[
    "_sip._tcp",
    "_sip._udp",
    "_sips._tcp",
    "_sipfederationtls._tcp",
    "_xmpp-server._tcp",
    "_xmpp-client._tcp",
    "_jabber._tcp",
    "_ldap._tcp",
    "_gc._tcp",
    "_kerberos._tcp",
    "_kerberos._udp",
    "_kpasswd._tcp",
    "_autodiscover._tcp",
    "_caldav._tcp",
    "_caldavs._tcp",
    "_carddav._tcp",
    "_carddavs._tcp",
    "_imap._tcp",
    "_imaps._tcp",
    "_pop3._tcp",
    "_pop3s._tcp",
    "_submission._tcp",
    "_h323cs._tcp",
    "_vlmcs._tcp",
    "_minecraft._tcp",
];

/// Address family a dictionary probe asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

/// PTR lookup for one address
pub struct ReverseProbe {
    ip: IpAddr,
    resolver: Arc<DnsResolver>,
}

impl ReverseProbe {
    pub fn new(ip: IpAddr, resolver: Arc<DnsResolver>) -> Self {
        Self { ip, resolver }
    }
}

#[async_trait]
impl Probe for ReverseProbe {
    fn label(&self) -> String {
        format!("reverse {}", self.ip)
    }

    async fn run(&self) -> ProbeOutcome {
        let result = self.resolver.reverse(self.ip).await.map(|names| {
            names
                .into_iter()
                .map(|name| Record::new("reverse", self.ip.to_string(), name))
                .collect()
        });
        ProbeOutcome {
            label: self.label(),
            result,
        }
    }
}

/// Guess one subdomain of a domain
pub struct DictionaryProbe {
    domain: String,
    sub: String,
    family: Family,
    /// Wildcard answer for the domain; matching addresses are ignored
    blacklist: Option<IpAddr>,
    resolver: Arc<DnsResolver>,
}

impl DictionaryProbe {
    pub fn new(
        domain: impl Into<String>,
        sub: impl Into<String>,
        family: Family,
        blacklist: Option<IpAddr>,
        resolver: Arc<DnsResolver>,
    ) -> Self {
        Self {
            domain: domain.into(),
            sub: sub.into(),
            family,
            blacklist,
            resolver,
        }
    }

    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.sub, self.domain)
    }
}

#[async_trait]
impl Probe for DictionaryProbe {
    fn label(&self) -> String {
        match self.family {
            Family::V4 => format!("dictionary {}", self.fqdn()),
            Family::V6 => format!("dictionary6 {}", self.fqdn()),
        }
    }

    async fn run(&self) -> ProbeOutcome {
        let fqdn = self.fqdn();
        let canonical = self.resolver.canonical_name(&fqdn).await.ok().flatten();

        let addrs = match self.family {
            Family::V4 => self
                .resolver
                .ipv4_addresses(&fqdn)
                .await
                .map(|ips| ips.into_iter().map(IpAddr::V4).collect::<Vec<_>>()),
            Family::V6 => self
                .resolver
                .ipv6_addresses(&fqdn)
                .await
                .map(|ips| ips.into_iter().map(IpAddr::V6).collect::<Vec<_>>()),
        };

        let result = addrs
            .map(|addrs| dictionary_records(&fqdn, canonical.as_deref(), &addrs, self.blacklist));
        ProbeOutcome {
            label: self.label(),
            result,
        }
    }
}

/// Records for a resolved dictionary name
///
/// Addresses equal to the wildcard answer are dropped. When the name is an
/// alias the canonical name is reported against the same addresses.
pub fn dictionary_records(
    fqdn: &str,
    canonical: Option<&str>,
    addrs: &[IpAddr],
    blacklist: Option<IpAddr>,
) -> Vec<Record> {
    let mut records = Vec::new();
    for addr in addrs.iter().filter(|addr| Some(**addr) != blacklist) {
        records.push(Record::new("dictionary", addr.to_string(), fqdn));
        if let Some(canonical) = canonical.filter(|c| !c.is_empty() && *c != fqdn) {
            records.push(Record::new("dictionary", addr.to_string(), canonical));
        }
    }
    records
}

/// Resolve a random label under `domain` to detect wildcard records
pub async fn detect_wildcard(
    resolver: &DnsResolver,
    domain: &str,
    family: Family,
) -> Option<IpAddr> {
    let label: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    let probe_name = format!("{}.{}", label, domain);

    let found = match family {
        Family::V4 => resolver
            .ipv4_addresses(&probe_name)
            .await
            .ok()
            .and_then(|ips| ips.first().copied().map(IpAddr::V4)),
        Family::V6 => resolver
            .ipv6_addresses(&probe_name)
            .await
            .ok()
            .and_then(|ips| ips.first().copied().map(IpAddr::V6)),
    };

    if let Some(ip) = found {
        log::info!("Wildcard record detected for {}: ignoring {}", domain, ip);
    }
    found
}

/// Which record type a [`LookupProbe`] follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    NameServer,
    MailExchanger,
    Service,
}

impl LookupKind {
    pub fn source(&self) -> &'static str {
        match self {
            LookupKind::NameServer => "ns",
            LookupKind::MailExchanger => "mx",
            LookupKind::Service => "srv",
        }
    }
}

/// NS, MX or SRV lookup for a domain, followed by address lookups of the
/// names it returns
pub struct LookupProbe {
    domain: String,
    kind: LookupKind,
    ipv6: bool,
    resolver: Arc<DnsResolver>,
}

impl LookupProbe {
    pub fn new(
        domain: impl Into<String>,
        kind: LookupKind,
        ipv6: bool,
        resolver: Arc<DnsResolver>,
    ) -> Self {
        Self {
            domain: domain.into(),
            kind,
            ipv6,
            resolver,
        }
    }

    async fn target_names(&self) -> Result<Vec<String>, ProbeError> {
        match self.kind {
            LookupKind::NameServer => self.resolver.name_servers(&self.domain).await,
            LookupKind::MailExchanger => self.resolver.mail_exchangers(&self.domain).await,
            LookupKind::Service => {
                let lookups = SRV_NAMES
                    .iter()
                    .map(|srv| format!("{}.{}", srv, self.domain))
                    .map(|name| {
                        let resolver = self.resolver.clone();
                        async move { resolver.service_targets(&name).await }
                    });

                let mut targets: Vec<String> = join_all(lookups)
                    .await
                    .into_iter()
                    .filter_map(Result::ok)
                    .flatten()
                    .collect();
                targets.sort();
                targets.dedup();
                Ok(targets)
            }
        }
    }
}

#[async_trait]
impl Probe for LookupProbe {
    fn label(&self) -> String {
        format!("{} {}", self.kind.source(), self.domain)
    }

    async fn run(&self) -> ProbeOutcome {
        let names = match self.target_names().await {
            Ok(names) => names,
            Err(err) => return ProbeOutcome::failure(self.label(), err),
        };

        let records = resolve_names(&self.resolver, self.kind.source(), names, self.ipv6).await;
        ProbeOutcome::success(self.label(), records)
    }
}

/// Look up every name concurrently, keeping the order of `names`
async fn resolve_names(
    resolver: &DnsResolver,
    source: &str,
    names: Vec<String>,
    ipv6: bool,
) -> Vec<Record> {
    let lookups = names.into_iter().filter(|name| !name.is_empty()).map(|name| async move {
        let addrs = resolver.addresses(&name, ipv6).await.unwrap_or_default();
        addrs
            .into_iter()
            .map(|addr| Record::new(source, addr.to_string(), name.clone()))
            .collect::<Vec<_>>()
    });

    join_all(lookups).await.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_dictionary_records_skip_wildcard_address() {
        let records = dictionary_records(
            "www.example.com",
            None,
            &[ip("192.0.2.1"), ip("192.0.2.99")],
            Some(ip("192.0.2.99")),
        );
        assert_eq!(records, vec![Record::new("dictionary", "192.0.2.1", "www.example.com")]);
    }

    #[test]
    fn test_dictionary_records_report_canonical_name() {
        let records = dictionary_records(
            "shop.example.com",
            Some("shops.myhost.net"),
            &[ip("198.51.100.4")],
            None,
        );
        assert_eq!(
            records,
            vec![
                Record::new("dictionary", "198.51.100.4", "shop.example.com"),
                Record::new("dictionary", "198.51.100.4", "shops.myhost.net"),
            ]
        );
    }

    #[test]
    fn test_dictionary_records_empty_when_unresolved() {
        assert!(dictionary_records("nope.example.com", None, &[], None).is_empty());
    }

    #[tokio::test]
    async fn test_labels_name_the_target() {
        let timeout = std::time::Duration::from_millis(100);
        let resolver = Arc::new(DnsResolver::new(ip("127.0.0.1"), timeout));
        assert_eq!(ReverseProbe::new(ip("8.8.8.8"), resolver.clone()).label(), "reverse 8.8.8.8");
        assert_eq!(
            DictionaryProbe::new("example.com", "www", Family::V6, None, resolver.clone()).label(),
            "dictionary6 www.example.com"
        );
        assert_eq!(
            LookupProbe::new("example.com", LookupKind::MailExchanger, false, resolver).label(),
            "mx example.com"
        );
    }
}
