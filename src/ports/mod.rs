// Ports - Interface definitions (contracts)

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for media file probing and analysis
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe media file and return its container and track information
    async fn probe_media(&self, file_path: &Path) -> Result<MediaInfo, DomainError>;
}

/// How a video track is re-encoded
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEncoding {
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub rate: RateControl,
    /// Output size; `None` keeps the source size
    pub frame_size: Option<FrameSize>,
    /// Encoder threads; 0 lets the encoder decide
    pub threads: usize,
}

/// Encoder rate control
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateControl {
    /// Target bitrate in bits per second
    Bitrate(u64),
    /// Constant rate factor
    Crf(u8),
}

/// Declarative export configuration handed to an export adapter
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPlan {
    pub job_id: JobId,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub window: ClipWindow,
    pub mode: TransformMode,
    /// Encoding settings; `None` for passthrough
    pub encoding: Option<VideoEncoding>,
}

/// Terminal state reported by an export
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// One item of a progress subscription.
///
/// A subscription yields any number of `Progress` items followed by at most
/// one `Finished`.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSignal {
    Progress(f32),
    Finished(ExportOutcome),
}

/// Handle to a running export, independent of how it reports progress
pub trait ProgressSource: Send + Sync {
    /// Start relaying progress. Push-based sources ignore `interval`;
    /// poll-based sources sample at that rate until the export finishes.
    /// Only the first subscription receives signals.
    fn subscribe_progress(&self, interval: Duration) -> mpsc::UnboundedReceiver<SourceSignal>;

    /// Request abort. Stops any polling timer before returning.
    fn cancel(&self);
}

/// Port for starting exports
#[async_trait]
pub trait ExportPort: Send + Sync {
    /// Start the export described by `plan` and return immediately
    async fn begin_export(&self, plan: &ExportPlan) -> Result<Arc<dyn ProgressSource>, DomainError>;

    /// Signalling strategy of this port
    fn strategy(&self) -> ProgressStrategy;
}

/// Progress signalling strategy of an export port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStrategy {
    /// Integer percentages pushed through a listener
    Callback,
    /// Fractional progress sampled on a timer
    Polling,
}

impl ProgressStrategy {
    /// Parse strategy from string
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.to_lowercase().as_str() {
            "callback" | "push" => Ok(ProgressStrategy::Callback),
            "polling" | "poll" => Ok(ProgressStrategy::Polling),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid progress strategy: {}. Valid strategies: callback, polling",
                value
            ))),
        }
    }
}

impl fmt::Display for ProgressStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStrategy::Callback => f.write_str("callback"),
            ProgressStrategy::Polling => f.write_str("polling"),
        }
    }
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    /// Check if file exists
    async fn file_exists(&self, file_path: &Path) -> Result<bool, DomainError>;

    /// Delete file; a missing file is not an error
    async fn delete_file(&self, file_path: &Path) -> Result<(), DomainError>;

    /// Create a new, uniquely named output file and return its path
    async fn create_temp_output(&self, prefix: &str, suffix: &str) -> Result<PathBuf, DomainError>;
}
