//! Hostnames leaked through HTTP redirects

use crate::engine::{Probe, ProbeOutcome, Record};
use crate::error::ProbeError;
use crate::network::url_host;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{Client, Url};
use std::net::IpAddr;
use std::time::Duration;

/// Build the client shared by every headers probe
///
/// Redirects are not followed (the Location header is the whole point) and
/// certificates are not checked, since the request goes to a bare address.
pub fn build_client(timeout: Duration) -> Result<Client, ProbeError> {
    Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(ProbeError::from)
}

pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;

/// Requests `/` over HTTP and HTTPS and reads the Location header
pub struct HeadersProbe {
    ip: IpAddr,
    http_port: u16,
    https_port: u16,
    client: Client,
}

impl HeadersProbe {
    pub fn new(ip: IpAddr, client: Client) -> Self {
        Self {
            ip,
            http_port: HTTP_PORT,
            https_port: HTTPS_PORT,
            client,
        }
    }

    pub fn with_ports(mut self, http_port: u16, https_port: u16) -> Self {
        self.http_port = http_port;
        self.https_port = https_port;
        self
    }

    async fn location(&self, scheme: &str, port: u16) -> Result<Option<String>, ProbeError> {
        let url = format!("{}://{}:{}/", scheme, url_host(self.ip), port);
        let response = self.client.get(url).send().await?;
        Ok(response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(location_hostname))
    }
}

#[async_trait]
impl Probe for HeadersProbe {
    fn label(&self) -> String {
        format!("headers {}", self.ip)
    }

    async fn run(&self) -> ProbeOutcome {
        let mut records = Vec::new();
        let mut last_error = None;
        let mut answered = false;

        for (scheme, port) in [("http", self.http_port), ("https", self.https_port)] {
            match self.location(scheme, port).await {
                Ok(hostname) => {
                    answered = true;
                    if let Some(hostname) = hostname {
                        let record = Record::new("headers", self.ip.to_string(), hostname);
                        if !records.contains(&record) {
                            records.push(record);
                        }
                    }
                }
                Err(err) => last_error = Some(err),
            }
        }

        match (answered, last_error) {
            (false, Some(err)) => ProbeOutcome::failure(self.label(), err),
            _ => ProbeOutcome::success(self.label(), records),
        }
    }
}

/// Hostname of an absolute Location value, ignoring bare IP addresses
pub fn location_hostname(location: &str) -> Option<String> {
    let url = Url::parse(location.trim()).ok()?;
    url.domain().map(|domain| domain.trim_end_matches('.').to_lowercase())
}
