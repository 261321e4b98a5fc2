//! Polling-style export adapter
//!
//! The running export only exposes a fractional progress value that must be
//! sampled, plus a terminal status. Sampling happens on a timer owned by the
//! progress source; the timer is stopped when the export finishes, when it
//! is cancelled, and when the source is dropped.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::adapters::exec_ffmpeg::{FfmpegCommand, FfmpegProcess, ProcessExit};
use crate::domain::errors::DomainError;
use crate::domain::model::ClipWindow;
use crate::domain::rules::ProgressRules;
use crate::ports::*;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Status of a polled export
#[derive(Debug, Clone, PartialEq)]
pub enum ExportStatus {
    Exporting,
    Completed,
    Failed(String),
    Cancelled,
}

impl ExportStatus {
    fn outcome(self) -> Option<ExportOutcome> {
        match self {
            ExportStatus::Exporting => None,
            ExportStatus::Completed => Some(ExportOutcome::Completed),
            ExportStatus::Failed(message) => Some(ExportOutcome::Failed(message)),
            ExportStatus::Cancelled => Some(ExportOutcome::Cancelled),
        }
    }
}

impl From<ProcessExit> for ExportStatus {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Succeeded => ExportStatus::Completed,
            ProcessExit::Failed(message) => ExportStatus::Failed(message),
            ProcessExit::Cancelled => ExportStatus::Cancelled,
        }
    }
}

/// Export whose progress is read on demand
pub struct PolledExport {
    progress_bits: AtomicU32,
    status: watch::Sender<ExportStatus>,
    cancel_tx: watch::Sender<bool>,
}

impl PolledExport {
    fn new() -> (Arc<Self>, watch::Receiver<bool>) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (status, _) = watch::channel(ExportStatus::Exporting);
        let export = Arc::new(Self {
            progress_bits: AtomicU32::new(0f32.to_bits()),
            status,
            cancel_tx,
        });
        (export, cancel_rx)
    }

    /// Run `process` in the background, recording its progress
    pub fn start(process: FfmpegProcess, window: ClipWindow) -> Arc<Self> {
        let (export, cancel_rx) = Self::new();
        let task_export = Arc::clone(&export);

        tokio::spawn(async move {
            let exit = process
                .run(
                    |progress| {
                        let fraction = ProgressRules::window_fraction(progress.out_time_us, &window);
                        task_export.set_progress(fraction as f32);
                    },
                    cancel_rx,
                )
                .await;
            task_export.finish(exit.into());
        });

        export
    }

    /// Current progress fraction
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress_bits.load(Ordering::Acquire))
    }

    pub fn status(&self) -> ExportStatus {
        self.status.borrow().clone()
    }

    /// Ask the running process to stop
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Wait for a terminal status
    pub async fn wait(&self) -> ExportOutcome {
        let mut status = self.status.subscribe();
        let terminal = status
            .wait_for(|s| *s != ExportStatus::Exporting)
            .await
            .map(|s| s.clone());
        match terminal.ok().and_then(ExportStatus::outcome) {
            Some(outcome) => outcome,
            None => ExportOutcome::Failed("Export status became unavailable".to_string()),
        }
    }

    fn set_progress(&self, fraction: f32) {
        self.progress_bits.store(fraction.to_bits(), Ordering::Release);
    }

    fn finish(&self, status: ExportStatus) {
        debug!(status = ?status, "Polled export finished");
        self.status.send_replace(status);
    }
}

/// Sampling timer shared between a source and its completion task
#[derive(Default)]
struct PollTimer {
    handle: Mutex<Option<AbortHandle>>,
    stopped: AtomicBool,
}

impl PollTimer {
    fn arm(&self, handle: AbortHandle) {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if self.stopped.load(Ordering::Acquire) {
            handle.abort();
        } else {
            *slot = Some(handle);
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Progress source sampling a [`PolledExport`] on a timer
pub struct PollingProgressSource {
    export: Arc<PolledExport>,
    timer: Arc<PollTimer>,
    subscribed: AtomicBool,
}

impl PollingProgressSource {
    pub fn new(export: Arc<PolledExport>) -> Self {
        Self {
            export,
            timer: Arc::new(PollTimer::default()),
            subscribed: AtomicBool::new(false),
        }
    }

    /// Whether the sampling timer has been stopped
    pub fn timer_stopped(&self) -> bool {
        self.timer.is_stopped()
    }
}

impl ProgressSource for PollingProgressSource {
    fn subscribe_progress(&self, interval: Duration) -> mpsc::UnboundedReceiver<SourceSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.subscribed.swap(true, Ordering::AcqRel) {
            warn!("Progress already subscribed; returning a closed subscription");
            return rx;
        }

        let period = interval.max(MIN_POLL_INTERVAL);
        let sample_export = Arc::clone(&self.export);
        let sample_timer = Arc::clone(&self.timer);
        let sample_tx = tx.clone();
        let sampler = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if sample_timer.is_stopped() {
                    break;
                }
                if sample_tx
                    .send(SourceSignal::Progress(sample_export.progress()))
                    .is_err()
                {
                    break;
                }
            }
        });
        self.timer.arm(sampler.abort_handle());

        let export = Arc::clone(&self.export);
        let timer = Arc::clone(&self.timer);
        tokio::spawn(async move {
            let outcome = export.wait().await;
            timer.stop();
            let _ = tx.send(SourceSignal::Finished(outcome));
        });

        rx
    }

    fn cancel(&self) {
        self.timer.stop();
        self.export.cancel();
    }
}

impl Drop for PollingProgressSource {
    fn drop(&mut self) {
        self.timer.stop();
    }
}

/// Export adapter with timer-sampled progress
pub struct PollingExportAdapter {
    ffmpeg: PathBuf,
}

impl PollingExportAdapter {
    /// Create new adapter running the given ffmpeg executable
    pub fn new(ffmpeg: PathBuf) -> Self {
        Self { ffmpeg }
    }
}

#[async_trait]
impl ExportPort for PollingExportAdapter {
    async fn begin_export(&self, plan: &ExportPlan) -> Result<Arc<dyn ProgressSource>, DomainError> {
        let command = FfmpegCommand::from_plan(plan);
        let process = FfmpegProcess::spawn(&self.ffmpeg, &command)?;
        let export = PolledExport::start(process, plan.window);

        Ok(Arc::new(PollingProgressSource::new(export)))
    }

    fn strategy(&self) -> ProgressStrategy {
        ProgressStrategy::Polling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(10);
    const WAIT: Duration = Duration::from_secs(2);

    async fn next(rx: &mut mpsc::UnboundedReceiver<SourceSignal>) -> Option<SourceSignal> {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("subscription stalled")
    }

    #[tokio::test]
    async fn test_samples_progress_until_completion() {
        let (export, _cancel_rx) = PolledExport::new();
        let source = PollingProgressSource::new(Arc::clone(&export));
        let mut rx = source.subscribe_progress(TICK);

        export.set_progress(0.5);
        loop {
            match next(&mut rx).await {
                Some(SourceSignal::Progress(p)) if p == 0.5 => break,
                Some(SourceSignal::Progress(_)) => continue,
                other => panic!("unexpected signal: {:?}", other),
            }
        }

        export.finish(ExportStatus::Completed);
        loop {
            match next(&mut rx).await {
                Some(SourceSignal::Progress(_)) => continue,
                Some(SourceSignal::Finished(outcome)) => {
                    assert_eq!(outcome, ExportOutcome::Completed);
                    break;
                }
                None => panic!("subscription closed without completion"),
            }
        }

        // Timer stopped: the subscription drains and closes
        assert!(source.timer_stopped());
        assert_eq!(next(&mut rx).await, None);
    }

    #[tokio::test]
    async fn test_cancel_stops_timer_and_signals_process() {
        let (export, cancel_rx) = PolledExport::new();
        let source = PollingProgressSource::new(Arc::clone(&export));
        let mut rx = source.subscribe_progress(TICK);

        source.cancel();
        assert!(source.timer_stopped());
        assert!(*cancel_rx.borrow());

        export.finish(ExportStatus::Cancelled);
        let mut finished = None;
        while let Some(signal) = next(&mut rx).await {
            if let SourceSignal::Finished(outcome) = signal {
                finished = Some(outcome);
            }
        }
        assert_eq!(finished, Some(ExportOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_failure_status_is_reported() {
        let (export, _cancel_rx) = PolledExport::new();
        let source = PollingProgressSource::new(Arc::clone(&export));
        let mut rx = source.subscribe_progress(TICK);

        export.finish(ExportStatus::Failed("encoder crashed".to_string()));
        let mut finished = None;
        while let Some(signal) = next(&mut rx).await {
            if let SourceSignal::Finished(outcome) = signal {
                finished = Some(outcome);
            }
        }
        assert_eq!(
            finished,
            Some(ExportOutcome::Failed("encoder crashed".to_string()))
        );
    }

    #[tokio::test]
    async fn test_drop_stops_timer() {
        let (export, _cancel_rx) = PolledExport::new();
        let source = PollingProgressSource::new(Arc::clone(&export));
        let _rx = source.subscribe_progress(TICK);
        let timer = Arc::clone(&source.timer);

        drop(source);
        assert!(timer.is_stopped());
    }

    #[test]
    fn test_process_exit_maps_to_status() {
        assert_eq!(ExportStatus::from(ProcessExit::Succeeded), ExportStatus::Completed);
        assert_eq!(
            ExportStatus::from(ProcessExit::Failed("x".to_string())).outcome(),
            Some(ExportOutcome::Failed("x".to_string()))
        );
        assert_eq!(ExportStatus::Exporting.outcome(), None);
    }
}
