//! Two-phase shutdown handshake
//!
//! The order is fixed: close the task queue, collect one signal per worker,
//! drop the last results sender, collect the aggregator's signal. Only after
//! that may the result set be read. Closing the results channel any earlier
//! would lose records still in flight.

use crate::engine::pool::TaskQueue;
use crate::engine::probe::Record;
use crate::{ReconError, Result};
use tokio::sync::mpsc;

/// Rendezvous message sent when a participant has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Worker(usize),
    Aggregator,
}

/// Signals observed while draining
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub worker_signals: usize,
    pub aggregator_signals: usize,
}

/// Receiving end of the completion channel, held by the producer
#[derive(Debug)]
pub struct ShutdownCoordinator {
    workers: usize,
    signals: mpsc::Receiver<Completion>,
}

impl ShutdownCoordinator {
    /// Create a coordinator expecting `workers` worker signals plus one
    /// aggregator signal.
    ///
    /// The returned sender is the template for every participant; the
    /// caller must drop its own copy once all participants hold a clone, so
    /// a participant that dies without signalling closes the channel instead
    /// of hanging the drain.
    pub fn new(workers: usize) -> (Self, mpsc::Sender<Completion>) {
        let (tx, rx) = mpsc::channel(workers + 1);
        (
            Self {
                workers,
                signals: rx,
            },
            tx,
        )
    }

    pub fn expected_workers(&self) -> usize {
        self.workers
    }

    /// Run the handshake to completion
    ///
    /// Takes ownership of the task queue and the producer's results sender
    /// so neither can be used out of order.
    pub async fn drain(
        mut self,
        mut tasks: TaskQueue,
        results: mpsc::Sender<Vec<Record>>,
    ) -> Result<ShutdownReport> {
        let mut report = ShutdownReport::default();

        tasks.close();

        while report.worker_signals < self.workers {
            match self.signals.recv().await {
                Some(Completion::Worker(id)) => {
                    report.worker_signals += 1;
                    log::trace!(
                        "Worker {} finished ({}/{})",
                        id,
                        report.worker_signals,
                        self.workers
                    );
                }
                Some(Completion::Aggregator) => {
                    return Err(ReconError::ShutdownError(
                        "aggregator finished while workers were still running".to_string(),
                    ));
                }
                None => {
                    return Err(ReconError::ShutdownError(format!(
                        "completion channel closed after {} of {} worker signals",
                        report.worker_signals, self.workers
                    )));
                }
            }
        }

        // No worker can send any more; this closes the results channel.
        drop(results);

        match self.signals.recv().await {
            Some(Completion::Aggregator) => report.aggregator_signals += 1,
            Some(Completion::Worker(id)) => {
                return Err(ReconError::ShutdownError(format!(
                    "unexpected extra signal from worker {}",
                    id
                )));
            }
            None => {
                return Err(ReconError::ShutdownError(
                    "completion channel closed before the aggregator finished".to_string(),
                ));
            }
        }

        Ok(report)
    }
}
