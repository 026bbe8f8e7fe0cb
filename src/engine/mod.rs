//! Concurrent probe execution and result aggregation
//!
//! One producer queues probes, `concurrency` workers run them, and a single
//! aggregator owns the deduplicated results. The [`ShutdownCoordinator`]
//! sequences teardown so the result set is only read after everyone else
//! has stopped.

pub mod aggregator;
pub mod pool;
pub mod probe;
pub mod results;
pub mod shutdown;

pub use aggregator::{
    confirm_hostname, is_valid_hostname, AggregationMode, ForwardResolver, ResultAggregator,
    FCRDNS_SOURCE,
};
pub use pool::{ProgressReporter, SilentReporter, SpinnerReporter, TaskQueue, TaskReceiver};
pub use probe::{BoxedProbe, FnProbe, Probe, ProbeOutcome, Record};
pub use results::{compare_by_ipv4, sort_records, ResultSet};
pub use shutdown::{Completion, ShutdownCoordinator, ShutdownReport};

use crate::config::ReconConfig;
use crate::{ReconError, Result};
use pool::Worker;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct ReconRun {
    /// Unique records ordered by IPv4 value
    pub records: Vec<Record>,
    /// Number of probes that were queued
    pub probes: usize,
    pub shutdown: ShutdownReport,
    pub duration: Duration,
}

/// Main reconnaissance engine
pub struct ReconEngine {
    concurrency: usize,
    debug: bool,
    mode: AggregationMode,
    reporter: Arc<dyn ProgressReporter>,
}

impl ReconEngine {
    /// Create an engine from configuration
    ///
    /// `resolver` is required when `config.fcrdns` is set and ignored
    /// otherwise.
    pub fn new(config: &ReconConfig, resolver: Option<Arc<dyn ForwardResolver>>) -> Result<Self> {
        config.validate()?;

        let mode = if config.fcrdns {
            let resolver = resolver.ok_or_else(|| {
                ReconError::ConfigError("forward confirmation needs a DNS resolver".to_string())
            })?;
            AggregationMode::ForwardConfirm {
                resolver,
                ipv6: config.ipv6,
            }
        } else {
            AggregationMode::Plain {
                validate: config.validate,
            }
        };

        Ok(Self {
            concurrency: config.concurrency,
            debug: config.debug,
            mode,
            reporter: Arc::new(SilentReporter),
        })
    }

    /// Replace the progress reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn mode(&self) -> &AggregationMode {
        &self.mode
    }

    /// Run every probe and return the sorted, deduplicated records
    pub async fn run<I>(&self, probes: I) -> Result<ReconRun>
    where
        I: IntoIterator<Item = BoxedProbe>,
    {
        let start_time = Instant::now();

        let (queue, tasks) = TaskQueue::bounded(self.concurrency);
        let (results_tx, results_rx) = mpsc::channel::<Vec<Record>>(self.concurrency);
        let (coordinator, completions) = ShutdownCoordinator::new(self.concurrency);

        let aggregator =
            ResultAggregator::new(self.mode.clone()).spawn(results_rx, completions.clone());

        log::info!("Spreading tasks across {} workers", self.concurrency);
        for id in 0..self.concurrency {
            Worker {
                id,
                tasks: tasks.clone(),
                results: results_tx.clone(),
                completions: completions.clone(),
                reporter: self.reporter.clone(),
                debug: self.debug,
            }
            .spawn();
        }
        drop(tasks);
        drop(completions);

        let mut queued = 0usize;
        for probe in probes {
            queue.enqueue(probe).await?;
            queued += 1;
        }
        log::debug!("Queued {} probes", queued);

        let report = coordinator.drain(queue, results_tx).await?;
        self.reporter.finish();

        let results = aggregator
            .await
            .map_err(|e| ReconError::ShutdownError(format!("aggregator task failed: {}", e)))?;

        log::info!("All tasks completed");

        Ok(ReconRun {
            records: results.into_sorted(),
            probes: queued,
            shutdown: report,
            duration: start_time.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fcrdns_requires_resolver() {
        let config = ReconConfig::default().with_fcrdns(true);
        assert!(matches!(
            ReconEngine::new(&config, None),
            Err(ReconError::ConfigError(_))
        ));
    }

    #[test]
    fn test_plain_mode_by_default() {
        let engine = ReconEngine::new(&ReconConfig::default().with_validate(true), None).unwrap();
        assert!(matches!(engine.mode(), AggregationMode::Plain { validate: true }));
        assert_eq!(engine.concurrency(), 100);
    }

    #[tokio::test]
    async fn test_run_without_probes() {
        let engine = ReconEngine::new(&ReconConfig::default().with_concurrency(4), None).unwrap();
        let run = engine.run(Vec::<BoxedProbe>::new()).await.unwrap();
        assert!(run.records.is_empty());
        assert_eq!(run.probes, 0);
        assert_eq!(run.shutdown, ShutdownReport { worker_signals: 4, aggregator_signals: 1 });
    }
}
