//! Names from TLS certificates

use crate::engine::{Probe, ProbeOutcome, Record};
use crate::error::ProbeError;
use async_trait::async_trait;
use openssl::nid::Nid;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use openssl::x509::X509Ref;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;

pub const TLS_PORT: u16 = 443;

/// Connects to an address and reports the CommonName and DNS
/// SubjectAltNames of the certificate it serves
pub struct TlsProbe {
    ip: IpAddr,
    port: u16,
    timeout: Duration,
}

impl TlsProbe {
    pub fn new(ip: IpAddr, timeout: Duration) -> Self {
        Self {
            ip,
            port: TLS_PORT,
            timeout,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

#[async_trait]
impl Probe for TlsProbe {
    fn label(&self) -> String {
        format!("tls {}", SocketAddr::new(self.ip, self.port))
    }

    async fn run(&self) -> ProbeOutcome {
        let (ip, port, timeout) = (self.ip, self.port, self.timeout);

        // openssl streams are blocking; keep them off the async workers
        let handle =
            tokio::task::spawn_blocking(move || fetch_certificate_names(ip, port, timeout));
        let result = match handle.await {
            Ok(result) => result,
            Err(err) => Err(ProbeError::Other(err.to_string())),
        };

        let result = result.map(|names| {
            names
                .into_iter()
                .map(|name| Record::new("tls", ip.to_string(), name))
                .collect()
        });

        ProbeOutcome {
            label: self.label(),
            result,
        }
    }
}

fn fetch_certificate_names(
    ip: IpAddr,
    port: u16,
    timeout: Duration,
) -> Result<Vec<String>, ProbeError> {
    let stream = TcpStream::connect_timeout(&SocketAddr::new(ip, port), timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let mut builder = SslConnector::builder(SslMethod::tls())?;
    builder.set_verify(SslVerifyMode::NONE);
    let connector = builder.build();

    let mut session = connector.configure()?;
    session.set_verify_hostname(false);
    session.set_use_server_name_indication(false);

    let tls = session
        .connect(&ip.to_string(), stream)
        .map_err(|e| ProbeError::Tls(e.to_string()))?;

    let cert = tls
        .ssl()
        .peer_certificate()
        .ok_or_else(|| ProbeError::Tls("server presented no certificate".to_string()))?;

    Ok(certificate_names(&cert))
}

/// CommonName entries followed by DNS SubjectAltNames, without duplicates
pub fn certificate_names(cert: &X509Ref) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    };

    for entry in cert.subject_name().entries_by_nid(Nid::COMMONNAME) {
        if let Ok(cn) = entry.data().as_utf8() {
            push(&cn.to_string());
        }
    }

    if let Some(alt_names) = cert.subject_alt_names() {
        for alt in alt_names.iter() {
            if let Some(dns) = alt.dnsname() {
                push(dns);
            }
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::ec::{EcGroup, EcKey};
    use openssl::hash::MessageDigest;
    use openssl::pkey::PKey;
    use openssl::x509::extension::SubjectAlternativeName;
    use openssl::x509::{X509Builder, X509NameBuilder};

    fn self_signed(cn: &str, sans: &[&str]) -> openssl::x509::X509 {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
        let name = name.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();

        if !sans.is_empty() {
            let mut san = SubjectAlternativeName::new();
            for dns in sans {
                san.dns(dns);
            }
            san.ip("10.0.0.1");
            let extension = san.build(&builder.x509v3_context(None, None)).unwrap();
            builder.append_extension(extension).unwrap();
        }

        builder.sign(&key, MessageDigest::sha256()).unwrap();
        builder.build()
    }

    #[test]
    fn test_common_name_then_alt_names() {
        let cert = self_signed(
            "www.example.com",
            &["api.example.com", "WWW.example.com", "*.cdn.example.com"],
        );
        assert_eq!(
            certificate_names(&cert),
            vec!["www.example.com", "api.example.com", "*.cdn.example.com"]
        );
    }

    #[test]
    fn test_common_name_only() {
        let cert = self_signed("mail.example.org", &[]);
        assert_eq!(certificate_names(&cert), vec!["mail.example.org"]);
    }

    #[tokio::test]
    async fn test_refused_connection_is_probe_failure() {
        // Nothing listens on port 9 of localhost in the test environment.
        let probe =
            TlsProbe::new("127.0.0.1".parse().unwrap(), Duration::from_millis(200)).with_port(9);
        assert_eq!(probe.label(), "tls 127.0.0.1:9");
        let outcome = probe.run().await;
        assert!(!outcome.is_success());
    }
}
