//! Callback-style export adapter
//!
//! Runs ffmpeg and reports through a [`TransformListener`]: whole-number
//! percentages while running, then exactly one of `on_completed` or
//! `on_error`. A direct cancel detaches the listener, so no callback at all
//! follows it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::adapters::exec_ffmpeg::{FfmpegCommand, FfmpegProcess, ProcessExit};
use crate::domain::errors::DomainError;
use crate::domain::model::ClipWindow;
use crate::domain::rules::ProgressRules;
use crate::ports::*;

/// Receives callbacks from a running export
pub trait TransformListener: Send + Sync {
    /// Progress as a whole-number percentage
    fn on_progress(&self, percent: i32);

    fn on_completed(&self);

    fn on_error(&self, message: &str);
}

/// Listener that relays callbacks into a progress subscription
struct ChannelListener {
    tx: mpsc::UnboundedSender<SourceSignal>,
}

impl TransformListener for ChannelListener {
    fn on_progress(&self, percent: i32) {
        let _ = self
            .tx
            .send(SourceSignal::Progress(ProgressRules::percent_to_fraction(percent)));
    }

    fn on_completed(&self) {
        let _ = self.tx.send(SourceSignal::Finished(ExportOutcome::Completed));
    }

    fn on_error(&self, message: &str) {
        let _ = self
            .tx
            .send(SourceSignal::Finished(ExportOutcome::Failed(message.to_string())));
    }
}

/// Handle to an export driven by listener callbacks
pub struct CallbackExport {
    cancel_tx: watch::Sender<bool>,
    detached: Arc<AtomicBool>,
}

impl CallbackExport {
    /// Run `process` in the background, reporting to `listener`
    pub fn start(process: FfmpegProcess, window: ClipWindow, listener: Arc<dyn TransformListener>) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let detached = Arc::new(AtomicBool::new(false));
        let task_detached = Arc::clone(&detached);

        tokio::spawn(async move {
            let mut last_percent = -1;
            let exit = process
                .run(
                    |progress| {
                        if task_detached.load(Ordering::Acquire) {
                            return;
                        }
                        let fraction = ProgressRules::window_fraction(progress.out_time_us, &window);
                        let percent = ProgressRules::fraction_to_percent(fraction);
                        if percent != last_percent {
                            last_percent = percent;
                            listener.on_progress(percent);
                        }
                    },
                    cancel_rx,
                )
                .await;

            if task_detached.load(Ordering::Acquire) {
                debug!("Export finished after cancel; listener detached");
                return;
            }
            match exit {
                ProcessExit::Succeeded => listener.on_completed(),
                ProcessExit::Failed(message) => listener.on_error(&message),
                ProcessExit::Cancelled => {}
            }
        });

        Self { cancel_tx, detached }
    }

    /// Abort the export and detach the listener
    pub fn cancel(&self) {
        self.detached.store(true, Ordering::Release);
        self.cancel_tx.send_replace(true);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

/// Progress source relaying listener callbacks
pub struct CallbackProgressSource {
    export: CallbackExport,
    signals: Mutex<Option<mpsc::UnboundedReceiver<SourceSignal>>>,
}

impl CallbackProgressSource {
    fn new(export: CallbackExport, signals: mpsc::UnboundedReceiver<SourceSignal>) -> Self {
        Self {
            export,
            signals: Mutex::new(Some(signals)),
        }
    }
}

impl ProgressSource for CallbackProgressSource {
    fn subscribe_progress(&self, _interval: Duration) -> mpsc::UnboundedReceiver<SourceSignal> {
        let taken = self
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(signals) => signals,
            None => {
                warn!("Progress already subscribed; returning a closed subscription");
                mpsc::unbounded_channel().1
            }
        }
    }

    fn cancel(&self) {
        self.export.cancel();
    }
}

/// Export adapter with push-style progress
pub struct CallbackExportAdapter {
    ffmpeg: PathBuf,
}

impl CallbackExportAdapter {
    /// Create new adapter running the given ffmpeg executable
    pub fn new(ffmpeg: PathBuf) -> Self {
        Self { ffmpeg }
    }
}

#[async_trait]
impl ExportPort for CallbackExportAdapter {
    async fn begin_export(&self, plan: &ExportPlan) -> Result<Arc<dyn ProgressSource>, DomainError> {
        let command = FfmpegCommand::from_plan(plan);
        let process = FfmpegProcess::spawn(&self.ffmpeg, &command)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let listener: Arc<dyn TransformListener> = Arc::new(ChannelListener { tx });
        let export = CallbackExport::start(process, plan.window, listener);

        Ok(Arc::new(CallbackProgressSource::new(export, rx)))
    }

    fn strategy(&self) -> ProgressStrategy {
        ProgressStrategy::Callback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_listener_converts_percentages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener = ChannelListener { tx };

        listener.on_progress(42);
        listener.on_progress(250);
        listener.on_error("disk full");

        assert_eq!(rx.try_recv().unwrap(), SourceSignal::Progress(0.42));
        assert_eq!(rx.try_recv().unwrap(), SourceSignal::Progress(1.0));
        assert_eq!(
            rx.try_recv().unwrap(),
            SourceSignal::Finished(ExportOutcome::Failed("disk full".to_string()))
        );
    }

    #[test]
    fn test_cancel_detaches_and_signals_process() {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let export = CallbackExport {
            cancel_tx,
            detached: Arc::new(AtomicBool::new(false)),
        };

        export.cancel();
        assert!(export.is_detached());
        assert!(*cancel_rx.borrow());

        // Idempotent
        export.cancel();
        assert!(export.is_detached());
    }

    #[test]
    fn test_subscription_is_single_use() {
        let (cancel_tx, _cancel_rx) = watch::channel(false);
        let export = CallbackExport {
            cancel_tx,
            detached: Arc::new(AtomicBool::new(false)),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let source = CallbackProgressSource::new(export, rx);

        let mut first = source.subscribe_progress(Duration::from_millis(100));
        tx.send(SourceSignal::Progress(0.5)).unwrap();
        assert_eq!(first.try_recv().unwrap(), SourceSignal::Progress(0.5));

        let mut second = source.subscribe_progress(Duration::from_millis(100));
        assert!(matches!(
            second.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
