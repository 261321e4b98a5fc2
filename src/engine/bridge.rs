//! Progress/completion bridge
//!
//! Drives one job's progress subscription to its terminal outcome and turns
//! it into the two outward views: the notification channel and the one-shot
//! result. On success the final `1.0` progress is posted before the result
//! resolves; on failure both channels are notified; a cancel only resolves
//! the result.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::ProgressNormalizer;
use crate::engine::dispatch::MainContext;
use crate::engine::job::{Job, JobSlot};
use crate::engine::progress::SinkSlot;
use crate::ports::*;

/// Relays one job at a time onto the main context
pub struct ProgressBridge {
    main: MainContext,
    sink: SinkSlot,
    fs_port: Arc<dyn FsPort>,
    poll_interval: Duration,
}

impl ProgressBridge {
    pub fn new(main: MainContext, sink: SinkSlot, fs_port: Arc<dyn FsPort>, poll_interval: Duration) -> Self {
        Self {
            main,
            sink,
            fs_port,
            poll_interval,
        }
    }

    /// Run `job` to completion, then release `slot` and resolve `result_tx`
    pub async fn drive(&self, job: Job, slot: JobSlot, result_tx: oneshot::Sender<OutcomeResult>) {
        let outcome = self.relay_progress(&job, &slot).await;
        let result = self.settle(&job, outcome).await;

        match &result {
            OutcomeResult::Success(path) => {
                info!(job_id = %job.id, output = %path.display(), "Job completed")
            }
            OutcomeResult::Failure { code, message } => {
                warn!(job_id = %job.id, %code, %message, "Job failed")
            }
            OutcomeResult::Cancelled => info!(job_id = %job.id, "Job cancelled"),
        }

        // Release before resolving so the caller can start the next job
        // as soon as it sees the result.
        slot.release(job.id);
        drop(job);

        let sink = self.sink.clone();
        self.main.post(move || {
            match &result {
                OutcomeResult::Success(_) => sink.emit(ChannelEvent::Progress { value: 1.0 }),
                OutcomeResult::Failure { code, message } => sink.emit(ChannelEvent::Error {
                    code: *code,
                    message: message.clone(),
                }),
                OutcomeResult::Cancelled => {}
            }
            let _ = result_tx.send(result);
        });
    }

    async fn relay_progress(&self, job: &Job, slot: &JobSlot) -> ExportOutcome {
        let mut signals = job.source().subscribe_progress(self.poll_interval);
        let mut normalizer = ProgressNormalizer::new();

        loop {
            match signals.recv().await {
                Some(SourceSignal::Progress(raw)) => {
                    if let Some(value) = normalizer.accept(raw as f64) {
                        let sink = self.sink.clone();
                        self.main
                            .post(move || sink.emit(ChannelEvent::Progress { value }));
                    }
                }
                Some(SourceSignal::Finished(outcome)) => return outcome,
                None if slot.cancel_requested(job.id) => return ExportOutcome::Cancelled,
                None => {
                    return ExportOutcome::Failed(
                        "Export ended without reporting an outcome".to_string(),
                    )
                }
            }
        }
    }

    async fn settle(&self, job: &Job, outcome: ExportOutcome) -> OutcomeResult {
        match outcome {
            ExportOutcome::Completed => OutcomeResult::Success(job.destination().clone()),
            ExportOutcome::Failed(message) => {
                self.discard_partial(job.destination()).await;
                OutcomeResult::Failure {
                    code: ErrorCode::ProcessingFailed,
                    message,
                }
            }
            ExportOutcome::Cancelled => {
                self.discard_partial(job.destination()).await;
                OutcomeResult::Cancelled
            }
        }
    }

    async fn discard_partial(&self, destination: &Path) {
        if let Err(e) = self.fs_port.delete_file(destination).await {
            warn!("Failed to remove partial output {}: {}", destination.display(), e);
        }
    }
}
