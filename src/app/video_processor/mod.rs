// Video processor - Single-job transform facade with a notification channel

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::*;
use crate::ports::*;

/// Prefix of generated transcode outputs
pub const PROCESSED_PREFIX: &str = "processed_";
/// Prefix of generated trim outputs
pub const TRIMMED_PREFIX: &str = "trimmed_only_";
const OUTPUT_SUFFIX: &str = ".mp4";

/// Runs at most one transform at a time and relays its progress to the
/// registered listener
pub struct VideoProcessor {
    invoker: Arc<TransformInvoker>,
    bridge: Arc<ProgressBridge>,
    fs_port: Arc<dyn FsPort>,
    main: MainContext,
    sink: SinkSlot,
    slot: JobSlot,
    next_id: AtomicU64,
}

impl VideoProcessor {
    /// Create new processor. Must be called within a tokio runtime.
    pub fn new(invoker: Arc<TransformInvoker>, fs_port: Arc<dyn FsPort>, poll_interval: Duration) -> Self {
        let main = MainContext::spawn();
        let sink = SinkSlot::default();
        let bridge = Arc::new(ProgressBridge::new(
            main.clone(),
            sink.clone(),
            Arc::clone(&fs_port),
            poll_interval,
        ));

        Self {
            invoker,
            bridge,
            fs_port,
            main,
            sink,
            slot: JobSlot::default(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn strategy(&self) -> ProgressStrategy {
        self.invoker.strategy()
    }

    /// Start a transcode of `[start_secs, end_secs)`
    pub async fn start_process_video(
        &self,
        path: impl Into<PathBuf>,
        start_secs: f64,
        end_secs: f64,
        resolution_height: Option<u32>,
        bitrate: Option<u64>,
    ) -> Result<JobHandle, DomainError> {
        let window = ClipWindow::from_seconds(start_secs, end_secs)?;
        let request = TransformRequest::transcode(path, window, resolution_height, bitrate)?;
        self.start(request, PROCESSED_PREFIX).await
    }

    /// Start a lossless trim of `[start_secs, end_secs)`
    pub async fn start_trim_video(
        &self,
        path: impl Into<PathBuf>,
        start_secs: f64,
        end_secs: f64,
    ) -> Result<JobHandle, DomainError> {
        let window = ClipWindow::from_seconds(start_secs, end_secs)?;
        let request = TransformRequest::trim_only(path, window)?;
        self.start(request, TRIMMED_PREFIX).await
    }

    /// Transcode and wait for the output path
    pub async fn process_video(
        &self,
        path: impl Into<PathBuf>,
        start_secs: f64,
        end_secs: f64,
        resolution_height: Option<u32>,
        bitrate: Option<u64>,
    ) -> Result<PathBuf, DomainError> {
        self.start_process_video(path, start_secs, end_secs, resolution_height, bitrate)
            .await?
            .wait()
            .await
            .into_result()
    }

    /// Trim and wait for the output path
    pub async fn trim_video(
        &self,
        path: impl Into<PathBuf>,
        start_secs: f64,
        end_secs: f64,
    ) -> Result<PathBuf, DomainError> {
        self.start_trim_video(path, start_secs, end_secs)
            .await?
            .wait()
            .await
            .into_result()
    }

    /// Start `request`, writing to a new output named with `prefix`.
    ///
    /// Dropping the returned future before it resolves abandons the start:
    /// the slot is released and the pending output removed.
    pub async fn start(&self, request: TransformRequest, prefix: &str) -> Result<JobHandle, DomainError> {
        request.validate()?;
        let job_id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slot.reserve(job_id)?;
        let mut pending = PendingStart::new(job_id, self.slot.clone(), Arc::clone(&self.fs_port));

        match self.launch(&mut pending, &request, prefix).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                debug!(job_id = %job_id, error = %e, "Job failed to start");
                pending.abandon().await;
                Err(e)
            }
        }
    }

    async fn launch(
        &self,
        pending: &mut PendingStart,
        request: &TransformRequest,
        prefix: &str,
    ) -> Result<JobHandle, DomainError> {
        let job_id = pending.job_id;
        let destination = self.fs_port.create_temp_output(prefix, OUTPUT_SUFFIX).await?;
        pending.destination = Some(destination.clone());

        let job = self.invoker.start(job_id, request, &destination).await?;
        self.slot.attach(job_id, job.source());
        pending.disarm();

        let (result_tx, result_rx) = oneshot::channel();
        let bridge = Arc::clone(&self.bridge);
        let slot = self.slot.clone();
        tokio::spawn(async move {
            bridge.drive(job, slot, result_tx).await;
        });

        Ok(JobHandle::new(job_id, result_rx))
    }

    /// Request abort of the active job. No-op when idle.
    pub fn cancel(&self) {
        if !self.slot.cancel() {
            debug!("Cancel requested with no active job");
        }
    }

    /// Register a new listener, replacing any previous one
    pub fn listen(&self) -> EventStream {
        let (sink, stream) = EventSink::channel();
        let slot = self.sink.clone();
        self.main.post(move || slot.replace(sink));
        debug!("Listener registered");
        stream
    }

    /// Cancel the active job and drop the listener
    pub fn stop_listening(&self) {
        self.cancel();
        let slot = self.sink.clone();
        self.main.post(move || slot.clear());
        debug!("Listener cleared");
    }

    /// Host is going away: cancel the active job
    pub fn detach(&self) {
        info!("Processor detached");
        self.cancel();
    }

    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.slot.current()
    }

    /// Wait until every notification queued so far has been delivered
    pub async fn flush(&self) {
        self.main.flush().await;
    }
}

/// A reserved slot whose job has not reached the bridge yet.
///
/// Dropped while armed, it frees the slot and removes the pending output.
struct PendingStart {
    job_id: JobId,
    slot: JobSlot,
    fs_port: Arc<dyn FsPort>,
    destination: Option<PathBuf>,
    armed: bool,
}

impl PendingStart {
    fn new(job_id: JobId, slot: JobSlot, fs_port: Arc<dyn FsPort>) -> Self {
        Self {
            job_id,
            slot,
            fs_port,
            destination: None,
            armed: true,
        }
    }

    /// The job now belongs to the bridge
    fn disarm(&mut self) {
        self.armed = false;
        self.destination = None;
    }

    /// Remove the pending output, then free the slot
    async fn abandon(mut self) {
        if let Some(destination) = self.destination.take() {
            discard_output(self.fs_port.as_ref(), &destination).await;
        }
        self.slot.release(self.job_id);
        self.armed = false;
    }
}

impl Drop for PendingStart {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(job_id = %self.job_id, "Start abandoned before the job was running");
        self.slot.release(self.job_id);

        let Some(destination) = self.destination.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let fs_port = Arc::clone(&self.fs_port);
                runtime.spawn(async move {
                    discard_output(fs_port.as_ref(), &destination).await;
                });
            }
            Err(_) => warn!(
                "No runtime to remove abandoned output {}",
                destination.display()
            ),
        }
    }
}

async fn discard_output(fs_port: &dyn FsPort, destination: &Path) {
    if let Err(e) = fs_port.delete_file(destination).await {
        warn!("Failed to remove output {}: {}", destination.display(), e);
    }
}
