//! Bounded task queue and the workers that drain it

use crate::engine::probe::{BoxedProbe, ProbeOutcome, Record};
use crate::engine::shutdown::Completion;
use crate::error::ProbeError;
use crate::{ReconError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Producer side of the task queue
///
/// Capacity equals the worker count. `enqueue` waits while the queue is
/// full, so probes are never dropped.
#[derive(Debug)]
pub struct TaskQueue {
    sender: Option<mpsc::Sender<BoxedProbe>>,
    capacity: usize,
}

/// Consumer side of the task queue, shared by all workers
#[derive(Clone)]
pub struct TaskReceiver {
    inner: Arc<Mutex<mpsc::Receiver<BoxedProbe>>>,
}

impl TaskQueue {
    pub fn bounded(capacity: usize) -> (TaskQueue, TaskReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            TaskQueue {
                sender: Some(tx),
                capacity,
            },
            TaskReceiver {
                inner: Arc::new(Mutex::new(rx)),
            },
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// Queue a probe, waiting for room if the queue is full
    pub async fn enqueue(&self, probe: BoxedProbe) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ReconError::ShutdownError("task queue is closed".to_string()))?;

        sender
            .send(probe)
            .await
            .map_err(|_| ReconError::ShutdownError("no workers left to receive tasks".to_string()))
    }

    /// Signal that no more probes will be queued
    pub fn close(&mut self) {
        self.sender = None;
    }
}

impl TaskReceiver {
    /// Next probe, or None once the queue is closed and empty
    ///
    /// The shared receiver is only held for the dequeue itself.
    pub async fn dequeue(&self) -> Option<BoxedProbe> {
        let mut rx = self.inner.lock().await;
        rx.recv().await
    }
}

/// Cosmetic per-probe progress feedback
pub trait ProgressReporter: Send + Sync {
    /// Called once for every probe a worker finishes
    fn probe_finished(&self);

    /// Called once after the whole run
    fn finish(&self);
}

/// Reporter that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn probe_finished(&self) {}
    fn finish(&self) {}
}

/// Spinner on stderr that ticks as probes complete
pub struct SpinnerReporter {
    bar: ProgressBar,
}

impl SpinnerReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} {msg} ({pos} probes done)")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["\\", "|", "/", "-", "✓"]);
        bar.set_style(style);
        bar.set_message("Working");
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl Default for SpinnerReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for SpinnerReporter {
    fn probe_finished(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// A single pool member
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) tasks: TaskReceiver,
    pub(crate) results: mpsc::Sender<Vec<Record>>,
    pub(crate) completions: mpsc::Sender<Completion>,
    pub(crate) reporter: Arc<dyn ProgressReporter>,
    pub(crate) debug: bool,
}

impl Worker {
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        while let Some(probe) = self.tasks.dequeue().await {
            let outcome = invoke(probe).await;
            self.handle(outcome).await;
            if !self.debug {
                self.reporter.probe_finished();
            }
        }

        if self.completions.send(Completion::Worker(self.id)).await.is_err() {
            log::error!("Worker {} could not deliver its completion signal", self.id);
        }
    }

    async fn handle(&self, outcome: ProbeOutcome) {
        match outcome.result {
            Err(err) => {
                if self.debug {
                    log::warn!("{}: {}", outcome.label, err);
                }
            }
            Ok(records) if records.is_empty() => {}
            Ok(records) => {
                if self.debug {
                    log::debug!(
                        "{}: {} {}: task completed successfully",
                        outcome.label,
                        records[0].hostname,
                        records[0].ip
                    );
                }
                if self.results.send(records).await.is_err() {
                    log::error!(
                        "Worker {}: results channel closed, dropping output of {}",
                        self.id,
                        outcome.label
                    );
                }
            }
        }
    }
}

/// Run a probe on its own task so a panic stays contained to that probe
async fn invoke(probe: BoxedProbe) -> ProbeOutcome {
    let label = probe.label();
    match tokio::spawn(async move { probe.run().await }).await {
        Ok(outcome) => outcome,
        Err(join_err) => {
            ProbeOutcome::failure(label, ProbeError::Other(format!("probe aborted: {}", join_err)))
        }
    }
}
