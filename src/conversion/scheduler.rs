//! Conversion scheduler.
//!
//! Drains pending items through the single encoder surface, strictly one at a
//! time and in insertion order.

use super::EncoderSurface;
use crate::notifications::Notifier;
use crate::state::{EncodedArtifact, PendingJob, QueueStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use webpforge_common::{Error, Quality, Result};

/// Totals for one drain of the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub converted: usize,
    pub failed: usize,
    /// Encodes whose item was removed before they finished.
    pub discarded: usize,
}

impl DrainReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Converted => self.converted += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Discarded => self.discarded += 1,
        }
    }
}

enum Outcome {
    Converted,
    Failed,
    Discarded,
}

/// Serializes access to the encoder surface.
pub struct ConversionScheduler {
    queue: Arc<QueueStore>,
    surface: Arc<dyn EncoderSurface>,
    notifier: Notifier,
    in_flight: Semaphore,
    encode_timeout: Option<Duration>,
}

impl ConversionScheduler {
    pub fn new(queue: Arc<QueueStore>, surface: Arc<dyn EncoderSurface>, notifier: Notifier) -> Self {
        Self {
            queue,
            surface,
            notifier,
            in_flight: Semaphore::new(1),
            encode_timeout: None,
        }
    }

    /// Fail any single encode that runs longer than `timeout`.
    pub fn with_encode_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.encode_timeout = timeout;
        self
    }

    /// Convert pending items until none remain.
    ///
    /// A failed item is recorded and skipped; it never stalls the rest of
    /// the queue.
    pub async fn drain(&self) -> DrainReport {
        self.drain_while(|| true).await
    }

    /// Like [`drain`](Self::drain), but asks `keep_going` before each item.
    async fn drain_while(&self, mut keep_going: impl FnMut() -> bool) -> DrainReport {
        let mut report = DrainReport::default();

        while keep_going() {
            match self.process_next().await {
                Some(outcome) => report.record(outcome),
                None => break,
            }
        }

        if report != DrainReport::default() {
            info!(
                "Drain finished: {} converted, {} failed, {} discarded",
                report.converted, report.failed, report.discarded
            );
        }
        report
    }

    async fn process_next(&self) -> Option<Outcome> {
        let _permit = self.in_flight.acquire().await.ok()?;
        let job = self.queue.begin_next()?;

        info!(
            "Converting {} ({}) at {}",
            job.source_name, job.id, job.quality
        );

        match self.convert(&job).await {
            Ok(artifact) => match self.queue.complete(job.id, artifact) {
                Ok(item) => {
                    let size = item.result.map(|r| r.byte_size).unwrap_or_default();
                    info!(
                        "Conversion completed: {} ({} -> {} bytes)",
                        job.id, item.source_byte_size, size
                    );
                    Some(Outcome::Converted)
                }
                Err(Error::NotFound(_)) => {
                    debug!("Item {} was removed while converting; discarding result", job.id);
                    Some(Outcome::Discarded)
                }
                Err(e) => Some(self.record_failure(&job, &e)),
            },
            Err(e) => Some(self.record_failure(&job, &e)),
        }
    }

    fn record_failure(&self, job: &PendingJob, e: &Error) -> Outcome {
        error!("Conversion failed: {} - {}", job.id, e);
        match self.queue.fail(job.id, &e.to_string()) {
            Ok(_) => {
                self.notifier
                    .error(format!("Failed to convert {}", job.source_name));
                Outcome::Failed
            }
            Err(_) => {
                debug!("Item {} was removed while converting", job.id);
                Outcome::Discarded
            }
        }
    }

    /// Decode, draw and encode one job as a single awaited step.
    async fn convert(&self, job: &PendingJob) -> Result<EncodedArtifact> {
        let quality = Quality::new(job.quality.value());
        let encode = self.surface.encode(job.source.clone(), quality);

        let artifact = match self.encode_timeout {
            Some(limit) => tokio::time::timeout(limit, encode)
                .await
                .map_err(|_| Error::Timeout(limit.as_secs()))??,
            None => encode.await?,
        };

        if artifact.bytes.is_empty() {
            return Err(Error::EmptyOutput);
        }
        let expected = self.surface.format();
        if artifact.format != expected {
            return Err(Error::encode(format!(
                "surface produced {} output, expected {}",
                artifact.format, expected
            )));
        }
        Ok(artifact)
    }

    /// Drain whenever the queue signals a pending item, until shut down.
    ///
    /// Shutdown is observed between items; an in-flight encode always runs
    /// to completion.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: mpsc::Receiver<()>) {
        info!("Conversion scheduler started");

        loop {
            let mut stopping = false;
            self.drain_while(|| {
                if !stopping {
                    stopping = matches!(
                        shutdown_rx.try_recv(),
                        Ok(()) | Err(TryRecvError::Disconnected)
                    );
                }
                !stopping
            })
            .await;

            if stopping {
                info!("Conversion scheduler shutting down");
                break;
            }

            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Conversion scheduler shutting down");
                    break;
                }
                _ = self.queue.pending_available() => {
                    debug!("Pending item signalled");
                }
            }
        }
    }

    /// Start [`run`](Self::run) on the current runtime.
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let join = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle { shutdown_tx, join }
    }
}

/// Handle to a scheduler started with [`ConversionScheduler::spawn`].
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop after the in-flight item (if any) and wait for the loop to exit.
    pub async fn shutdown(self) {
        // The loop may already be gone; joining below still reports why.
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.join.await {
            error!("Conversion scheduler task failed: {}", e);
        }
    }
}
