//! Records and the probe abstraction run by the worker pool

use crate::error::ProbeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// A single hostname/IP observation
///
/// The whole triple is the identity: the same pair reported by two sources
/// is kept twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "src")]
    pub source: String,
    pub ip: String,
    pub hostname: String,
}

impl Record {
    pub fn new(
        source: impl Into<String>,
        ip: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            ip: ip.into(),
            hostname: hostname.into(),
        }
    }
}

/// What a probe hands back to its worker
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// Human readable name of the probe, only used for logging
    pub label: String,
    pub result: Result<Vec<Record>, ProbeError>,
}

impl ProbeOutcome {
    pub fn success(label: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            label: label.into(),
            result: Ok(records),
        }
    }

    pub fn failure(label: impl Into<String>, error: ProbeError) -> Self {
        Self {
            label: label.into(),
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// A unit of reconnaissance work
///
/// Implementations own every argument they need. The pool never looks
/// inside a probe; it only runs it and routes the outcome.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Label used when logging this probe
    fn label(&self) -> String;

    /// Run the probe to completion. Timeouts are the probe's own business.
    async fn run(&self) -> ProbeOutcome;
}

pub type BoxedProbe = Box<dyn Probe>;

/// Probe backed by an async closure
pub struct FnProbe<F> {
    label: String,
    f: F,
}

impl<F, Fut> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Record>, ProbeError>> + Send + 'static,
{
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }

    pub fn boxed(label: impl Into<String>, f: F) -> BoxedProbe {
        Box::new(Self::new(label, f))
    }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Record>, ProbeError>> + Send + 'static,
{
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn run(&self) -> ProbeOutcome {
        ProbeOutcome {
            label: self.label.clone(),
            result: (self.f)().await,
        }
    }
}
