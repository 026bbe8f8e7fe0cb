//! Single consumer of probe output
//!
//! The aggregator owns the [`ResultSet`] for the whole run. It either
//! inserts records as they arrive (optionally filtering hostnames through a
//! domain-name grammar) or, in forward-confirmation mode, replaces each
//! record with whatever the hostname actually resolves to.

use crate::engine::probe::Record;
use crate::engine::results::ResultSet;
use crate::engine::shutdown::Completion;
use crate::error::ProbeError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Source label given to forward-confirmed records
pub const FCRDNS_SOURCE: &str = "fcrdns";

static DOMAIN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\.?[a-z\d]+(?:(?:[a-z\d]*)|(?:[a-z\d\-]*[a-z\d]))(?:\.[a-z\d]+(?:(?:[a-z\d]*)|(?:[a-z\d\-]*[a-z\d])))*$",
    )
    .expect("domain name pattern is valid")
});

/// Check a hostname against the lowercase domain-name grammar
///
/// Labels are lowercase alphanumerics and hyphens, may not start or end with
/// a hyphen, and the name may carry a single leading dot.
pub fn is_valid_hostname(hostname: &str) -> bool {
    DOMAIN_NAME.is_match(hostname)
}

/// Forward lookups used to corroborate hostnames
#[async_trait]
pub trait ForwardResolver: Send + Sync {
    /// First IPv4 address of `name`, if any
    async fn lookup_ipv4(&self, name: &str) -> Result<Option<String>, ProbeError>;

    /// Canonical name of `name`, if it is an alias
    async fn lookup_cname(&self, name: &str) -> Result<Option<String>, ProbeError>;

    /// First IPv6 address of `name`, if any
    async fn lookup_ipv6(&self, name: &str) -> Result<Option<String>, ProbeError>;
}

/// How incoming records are accepted
#[derive(Clone)]
pub enum AggregationMode {
    /// Insert records as reported
    Plain { validate: bool },
    /// Insert only forward-confirmed records
    ForwardConfirm {
        resolver: Arc<dyn ForwardResolver>,
        ipv6: bool,
    },
}

impl std::fmt::Debug for AggregationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationMode::Plain { validate } => {
                f.debug_struct("Plain").field("validate", validate).finish()
            }
            AggregationMode::ForwardConfirm { ipv6, .. } => {
                f.debug_struct("ForwardConfirm").field("ipv6", ipv6).finish_non_exhaustive()
            }
        }
    }
}

pub struct ResultAggregator {
    mode: AggregationMode,
    results: ResultSet,
}

impl ResultAggregator {
    pub fn new(mode: AggregationMode) -> Self {
        Self {
            mode,
            results: ResultSet::new(),
        }
    }

    /// Move the aggregator onto its own task
    ///
    /// The task sends [`Completion::Aggregator`] once the results channel is
    /// closed and drained, then yields the finished set through its handle.
    pub fn spawn(
        self,
        incoming: mpsc::Receiver<Vec<Record>>,
        completion: mpsc::Sender<Completion>,
    ) -> JoinHandle<ResultSet> {
        tokio::spawn(self.run(incoming, completion))
    }

    pub async fn run(
        mut self,
        mut incoming: mpsc::Receiver<Vec<Record>>,
        completion: mpsc::Sender<Completion>,
    ) -> ResultSet {
        while let Some(batch) = incoming.recv().await {
            self.ingest(batch).await;
        }

        log::debug!("Aggregator drained, {} unique records", self.results.len());
        if completion.send(Completion::Aggregator).await.is_err() {
            log::error!("Aggregator could not deliver its completion signal");
        }
        self.results
    }

    /// Apply the configured mode to one probe's records
    pub async fn ingest(&mut self, batch: Vec<Record>) {
        match &self.mode {
            AggregationMode::Plain { validate } => {
                for record in batch {
                    if *validate && !is_valid_hostname(&record.hostname) {
                        log::trace!("Rejected invalid hostname {:?}", record.hostname);
                        continue;
                    }
                    self.results.insert(record);
                }
            }
            AggregationMode::ForwardConfirm { resolver, ipv6 } => {
                for record in &batch {
                    let confirmed =
                        confirm_hostname(resolver.as_ref(), &record.hostname, *ipv6).await;
                    self.results.extend(confirmed);
                }
            }
        }
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn into_results(self) -> ResultSet {
        self.results
    }
}

/// Forward-confirm a hostname
///
/// IPv4 directly, then IPv4 through the CNAME target, and independently
/// IPv6 when enabled. Lookup errors count as "not confirmed".
pub async fn confirm_hostname(
    resolver: &dyn ForwardResolver,
    hostname: &str,
    ipv6: bool,
) -> Vec<Record> {
    let mut confirmed = Vec::new();

    match ok_or_trace(resolver.lookup_ipv4(hostname).await, hostname) {
        Some(ip) => confirmed.push(Record::new(FCRDNS_SOURCE, ip, hostname)),
        None => {
            if let Some(canonical) = ok_or_trace(resolver.lookup_cname(hostname).await, hostname) {
                if let Some(ip) = ok_or_trace(resolver.lookup_ipv4(&canonical).await, &canonical) {
                    confirmed.push(Record::new(FCRDNS_SOURCE, ip, hostname));
                }
            }
        }
    }

    if ipv6 {
        if let Some(ip) = ok_or_trace(resolver.lookup_ipv6(hostname).await, hostname) {
            confirmed.push(Record::new(FCRDNS_SOURCE, ip, hostname));
        }
    }

    confirmed
}

fn ok_or_trace(result: Result<Option<String>, ProbeError>, name: &str) -> Option<String> {
    match result {
        Ok(Some(value)) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(err) => {
            log::trace!("fcrdns lookup for {} failed: {}", name, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_grammar() {
        for good in ["sub.example.com", ".example.com", "a", "x-1.y2", "123.example"] {
            assert!(is_valid_hostname(good), "{} should be valid", good);
        }
        for bad in [
            "bad_host!",
            "-lead.example.com",
            "trail-.example.com",
            "UPPER.example",
            "a..b",
            "",
            "example.com.",
        ] {
            assert!(!is_valid_hostname(bad), "{} should be invalid", bad);
        }
    }

    #[tokio::test]
    async fn test_plain_mode_dedups() {
        let mut aggregator = ResultAggregator::new(AggregationMode::Plain { validate: false });
        let record = Record::new("ns", "9.9.9.9", "ns1.example.com");
        aggregator.ingest(vec![record.clone(), record.clone()]).await;
        aggregator.ingest(vec![record.clone()]).await;
        assert_eq!(aggregator.results().len(), 1);
    }

    #[tokio::test]
    async fn test_plain_mode_validation_drops_bad_names() {
        let mut aggregator = ResultAggregator::new(AggregationMode::Plain { validate: true });
        aggregator
            .ingest(vec![
                Record::new("tls", "1.2.3.4", "bad_host!"),
                Record::new("tls", "1.2.3.4", "sub.example.com"),
            ])
            .await;

        let results = aggregator.into_results();
        assert_eq!(results.len(), 1);
        assert!(results.contains(&Record::new("tls", "1.2.3.4", "sub.example.com")));
    }

    struct FixedAnswer;

    #[async_trait]
    impl ForwardResolver for FixedAnswer {
        async fn lookup_ipv4(&self, _name: &str) -> Result<Option<String>, ProbeError> {
            Ok(Some("192.0.2.53".to_string()))
        }

        async fn lookup_cname(&self, _name: &str) -> Result<Option<String>, ProbeError> {
            Ok(None)
        }

        async fn lookup_ipv6(&self, _name: &str) -> Result<Option<String>, ProbeError> {
            Err(ProbeError::Timeout)
        }
    }

    #[tokio::test]
    async fn test_confirm_mode_across_batches() {
        let mut aggregator = ResultAggregator::new(AggregationMode::ForwardConfirm {
            resolver: Arc::new(FixedAnswer),
            ipv6: true,
        });
        aggregator.ingest(vec![Record::new("reverse", "10.0.0.1", "a.example")]).await;
        aggregator.ingest(vec![Record::new("tls", "10.0.0.2", "a.example")]).await;

        let results = aggregator.into_results();
        assert_eq!(results.len(), 1);
        assert!(results.contains(&Record::new(FCRDNS_SOURCE, "192.0.2.53", "a.example")));
    }

    #[tokio::test]
    async fn test_validation_off_keeps_everything() {
        let mut aggregator = ResultAggregator::new(AggregationMode::Plain { validate: false });
        aggregator.ingest(vec![Record::new("tls", "1.2.3.4", "bad_host!")]).await;
        assert_eq!(aggregator.results().len(), 1);
    }
}
