//! Transform invoker: turns a request into a running export

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::FrameSizer;
use crate::engine::job::Job;
use crate::ports::*;

/// Encoder settings applied to every transcode
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingDefaults {
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub crf: u8,
    pub threads: usize,
}

impl Default for EncodingDefaults {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            threads: 0,
        }
    }
}

/// Builds export plans and starts them
pub struct TransformInvoker {
    probe_port: Arc<dyn ProbePort>,
    export_port: Arc<dyn ExportPort>,
    fs_port: Arc<dyn FsPort>,
    defaults: EncodingDefaults,
}

impl TransformInvoker {
    /// Create new invoker with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        export_port: Arc<dyn ExportPort>,
        fs_port: Arc<dyn FsPort>,
        defaults: EncodingDefaults,
    ) -> Self {
        Self {
            probe_port,
            export_port,
            fs_port,
            defaults,
        }
    }

    pub fn strategy(&self) -> ProgressStrategy {
        self.export_port.strategy()
    }

    /// Validate `request` against the probed source and build its plan
    pub async fn plan(
        &self,
        job_id: JobId,
        request: &TransformRequest,
        destination: &Path,
    ) -> Result<ExportPlan, DomainError> {
        request.validate()?;
        if same_file(&request.source_path, destination) {
            return Err(DomainError::BadArgs(format!(
                "Destination must differ from source: {}",
                destination.display()
            )));
        }

        let media = self.probe_port.probe_media(&request.source_path).await?;
        let video = media.video.as_ref().ok_or_else(|| {
            DomainError::NoVideoTrack(format!(
                "No decodable video stream in {}",
                request.source_path.display()
            ))
        })?;

        if let Some(duration_ms) = media.duration_ms() {
            if request.window.start_ms >= duration_ms {
                return Err(DomainError::BadArgs(format!(
                    "Clip start {:.3}s is beyond the source duration {:.3}s",
                    request.window.start_seconds(),
                    duration_ms as f64 / 1000.0
                )));
            }
        }

        let encoding = match request.mode {
            TransformMode::Transcode => Some(self.encoding_for(request, video)?),
            TransformMode::TrimOnly => None,
        };

        Ok(ExportPlan {
            job_id,
            source: request.source_path.clone(),
            destination: destination.to_path_buf(),
            window: request.window,
            mode: request.mode,
            encoding,
        })
    }

    /// Plan and start the export. Returns once the export is running.
    pub async fn start(
        &self,
        job_id: JobId,
        request: &TransformRequest,
        destination: &Path,
    ) -> Result<Job, DomainError> {
        let plan = self.plan(job_id, request, destination).await?;

        self.fs_port
            .delete_file(&plan.destination)
            .await
            .map_err(|e| DomainError::SessionCreationFailed(e.detail()))?;

        let source = self.export_port.begin_export(&plan).await?;
        info!(
            job_id = %plan.job_id,
            mode = %plan.mode,
            source = %plan.source.display(),
            destination = %plan.destination.display(),
            window = %plan.window,
            strategy = %self.export_port.strategy(),
            "Export started"
        );
        Ok(Job::new(plan, source))
    }

    fn encoding_for(&self, request: &TransformRequest, video: &VideoTrack) -> Result<VideoEncoding, DomainError> {
        let frame_size = request
            .target_height
            .map(|height| FrameSizer::scale_to_height(video.display_size(), height))
            .transpose()?;
        if let Some(size) = frame_size {
            debug!(source = %video.display_size(), output = %size, "Scaling output");
        }

        let rate = match request.bitrate {
            Some(bits_per_second) => RateControl::Bitrate(bits_per_second),
            None => RateControl::Crf(self.defaults.crf),
        };

        Ok(VideoEncoding {
            video_codec: self.defaults.video_codec.clone(),
            audio_codec: self.defaults.audio_codec.clone(),
            preset: self.defaults.preset.clone(),
            rate,
            frame_size,
            threads: self.defaults.threads,
        })
    }
}
