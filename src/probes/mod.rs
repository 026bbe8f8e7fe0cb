//! Concrete probes and the plan that turns targets into them

pub mod dns;
pub mod http;
pub mod tls;

pub use dns::{detect_wildcard, DictionaryProbe, Family, LookupKind, LookupProbe, ReverseProbe};
pub use http::HeadersProbe;
pub use tls::TlsProbe;

use crate::config::ReconConfig;
use crate::engine::BoxedProbe;
use crate::network::DnsResolver;
use crate::{ReconError, Result};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Shared capabilities handed to every probe
#[derive(Clone)]
pub struct ProbeContext {
    pub resolver: Arc<DnsResolver>,
    pub http: reqwest::Client,
    pub timeout: Duration,
    pub ipv6: bool,
}

impl ProbeContext {
    pub fn from_config(config: &ReconConfig) -> Result<Self> {
        let resolver = Arc::new(DnsResolver::from_config(config)?);
        let http = http::build_client(config.timeout_duration())
            .map_err(|e| ReconError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            resolver,
            http,
            timeout: config.timeout_duration(),
            ipv6: config.ipv6,
        })
    }
}

/// Which probes to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeSelection {
    pub reverse: bool,
    pub tls: bool,
    pub headers: bool,
    pub ns: bool,
    pub mx: bool,
    pub srv: bool,
    /// Subdomain labels to try under each domain
    pub dictionary: Option<Vec<String>>,
}

impl ProbeSelection {
    pub fn uses_ips(&self) -> bool {
        self.reverse || self.tls || self.headers
    }

    pub fn uses_domains(&self) -> bool {
        self.ns || self.mx || self.srv || self.dictionary.is_some()
    }
}

/// Targets plus selected probes
#[derive(Debug, Clone, Default)]
pub struct ProbePlan {
    pub ips: Vec<IpAddr>,
    pub domains: Vec<String>,
    pub selection: ProbeSelection,
}

impl ProbePlan {
    pub fn new(ips: Vec<IpAddr>, domains: Vec<String>, selection: ProbeSelection) -> Self {
        Self {
            ips,
            domains,
            selection,
        }
    }

    /// Reject plans that cannot do any work
    pub fn validate(&self) -> Result<()> {
        if self.ips.is_empty() && self.domains.is_empty() {
            return Err(ReconError::InvalidTarget(
                "You didn't provide any work for me to do".to_string(),
            ));
        }
        if self.selection.dictionary.is_some() && self.domains.is_empty() {
            return Err(ReconError::ConfigError(
                "Dictionary lookup requires domain set with --domain".to_string(),
            ));
        }
        if self.selection.srv && self.domains.is_empty() {
            return Err(ReconError::ConfigError(
                "SRV lookup requires domain set with --domain".to_string(),
            ));
        }
        if !self.domains.is_empty() && !self.selection.uses_domains() {
            return Err(ReconError::ConfigError(
                "--domain provided but no methods provided that use it".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of probes `build` will produce, not counting IPv6 dictionary probes
    pub fn probe_count(&self) -> usize {
        let s = &self.selection;
        let per_ip = [s.reverse, s.tls, s.headers].iter().filter(|on| **on).count();
        let dictionary = s.dictionary.as_ref().map_or(0, Vec::len);
        let per_domain = [s.ns, s.mx, s.srv].iter().filter(|on| **on).count();
        self.ips.len() * per_ip + self.domains.len() * (per_domain + dictionary)
    }

    /// Create one probe per target/method pair
    ///
    /// Wildcard detection for dictionary domains happens here, before any
    /// probe runs, so every dictionary probe carries its blacklist.
    pub async fn build(&self, ctx: &ProbeContext) -> Vec<BoxedProbe> {
        let s = &self.selection;
        let mut probes: Vec<BoxedProbe> = Vec::with_capacity(self.probe_count());

        for ip in &self.ips {
            if s.reverse {
                probes.push(Box::new(ReverseProbe::new(*ip, ctx.resolver.clone())));
            }
            if s.tls {
                probes.push(Box::new(TlsProbe::new(*ip, ctx.timeout)));
            }
            if s.headers {
                probes.push(Box::new(HeadersProbe::new(*ip, ctx.http.clone())));
            }
        }

        for domain in &self.domains {
            if let Some(words) = &s.dictionary {
                let blacklist = detect_wildcard(&ctx.resolver, domain, Family::V4).await;
                let blacklist6 = if ctx.ipv6 {
                    detect_wildcard(&ctx.resolver, domain, Family::V6).await
                } else {
                    None
                };

                for sub in words {
                    probes.push(Box::new(DictionaryProbe::new(
                        domain.as_str(),
                        sub.as_str(),
                        Family::V4,
                        blacklist,
                        ctx.resolver.clone(),
                    )));
                    if ctx.ipv6 {
                        probes.push(Box::new(DictionaryProbe::new(
                            domain.as_str(),
                            sub.as_str(),
                            Family::V6,
                            blacklist6,
                            ctx.resolver.clone(),
                        )));
                    }
                }
            }

            let lookups = [
                (s.srv, LookupKind::Service),
                (s.ns, LookupKind::NameServer),
                (s.mx, LookupKind::MailExchanger),
            ];
            for (enabled, kind) in lookups {
                if enabled {
                    probes.push(Box::new(LookupProbe::new(
                        domain.as_str(),
                        kind,
                        ctx.ipv6,
                        ctx.resolver.clone(),
                    )));
                }
            }
        }

        probes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ips() -> Vec<IpAddr> {
        vec!["192.0.2.1".parse().unwrap(), "192.0.2.2".parse().unwrap()]
    }

    #[test]
    fn test_empty_plan_rejected() {
        let plan = ProbePlan::default();
        assert!(matches!(plan.validate(), Err(ReconError::InvalidTarget(_))));
    }

    #[test]
    fn test_domain_methods_need_domains() {
        let selection = ProbeSelection {
            srv: true,
            ..Default::default()
        };
        assert!(ProbePlan::new(ips(), vec![], selection).validate().is_err());

        let selection = ProbeSelection {
            dictionary: Some(vec!["www".into()]),
            ..Default::default()
        };
        assert!(ProbePlan::new(ips(), vec![], selection).validate().is_err());
    }

    #[test]
    fn test_domain_without_domain_methods_rejected() {
        let selection = ProbeSelection {
            reverse: true,
            ..Default::default()
        };
        let plan = ProbePlan::new(ips(), vec!["example.com".into()], selection);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_probe_count() {
        let selection = ProbeSelection {
            reverse: true,
            tls: true,
            mx: true,
            dictionary: Some(vec!["www".into(), "mail".into(), "vpn".into()]),
            ..Default::default()
        };
        let domains = vec!["example.com".into(), "example.org".into()];
        let plan = ProbePlan::new(ips(), domains, selection);
        assert!(plan.validate().is_ok());
        assert_eq!(plan.probe_count(), 2 * 2 + 2 * (1 + 3));
    }

    #[tokio::test]
    async fn test_build_ip_probes_without_network() {
        let config = ReconConfig::default().with_server("127.0.0.1").with_timeout(50);
        let ctx = ProbeContext::from_config(&config).unwrap();
        let selection = ProbeSelection {
            reverse: true,
            tls: true,
            headers: true,
            ..Default::default()
        };
        let plan = ProbePlan::new(ips(), vec![], selection);

        let probes = plan.build(&ctx).await;
        let labels: Vec<String> = probes.iter().map(|p| p.label()).collect();
        assert_eq!(
            labels,
            vec![
                "reverse 192.0.2.1",
                "tls 192.0.2.1:443",
                "headers 192.0.2.1",
                "reverse 192.0.2.2",
                "tls 192.0.2.2:443",
                "headers 192.0.2.2",
            ]
        );
    }
}
