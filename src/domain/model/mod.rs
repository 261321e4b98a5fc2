// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::errors::{DomainError, ErrorCode};

/// How the source is turned into the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformMode {
    /// Re-encode to H.264, optionally resized and rate-limited
    Transcode,
    /// Stream copy restricted to the clip window
    TrimOnly,
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformMode::Transcode => f.write_str("transcode"),
            TransformMode::TrimOnly => f.write_str("trim_only"),
        }
    }
}

/// Half-open `[start, end)` range of the source, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl ClipWindow {
    /// Create a clip window, rejecting empty or inverted ranges
    pub fn new(start_ms: u64, end_ms: u64) -> Result<Self, DomainError> {
        if end_ms <= start_ms {
            return Err(DomainError::BadArgs(format!(
                "End time ({} ms) must be greater than start time ({} ms)",
                end_ms, start_ms
            )));
        }
        Ok(Self { start_ms, end_ms })
    }

    /// Create a clip window from caller-facing seconds
    pub fn from_seconds(start: f64, end: f64) -> Result<Self, DomainError> {
        let start_ms = seconds_to_millis("startTime", start)?;
        let end_ms = seconds_to_millis("endTime", end)?;
        Self::new(start_ms, end_ms)
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    pub fn start_seconds(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms() as f64 / 1000.0
    }
}

impl fmt::Display for ClipWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} ms, {} ms)", self.start_ms, self.end_ms)
    }
}

/// Convert seconds to whole milliseconds, truncating the fractional part
pub fn seconds_to_millis(name: &str, seconds: f64) -> Result<u64, DomainError> {
    if !seconds.is_finite() {
        return Err(DomainError::BadArgs(format!("{} must be a finite number", name)));
    }
    if seconds < 0.0 {
        return Err(DomainError::BadArgs(format!("{} cannot be negative", name)));
    }
    Ok((seconds * 1000.0) as u64)
}

/// Normalized transform request
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub source_path: PathBuf,
    pub window: ClipWindow,
    pub target_height: Option<u32>,
    pub bitrate: Option<u64>,
    pub mode: TransformMode,
}

impl TransformRequest {
    /// Create a transcode request
    pub fn transcode(
        source_path: impl Into<PathBuf>,
        window: ClipWindow,
        target_height: Option<u32>,
        bitrate: Option<u64>,
    ) -> Result<Self, DomainError> {
        let request = Self {
            source_path: source_path.into(),
            window,
            target_height,
            bitrate,
            mode: TransformMode::Transcode,
        };
        request.validate()?;
        Ok(request)
    }

    /// Create a lossless trim request
    pub fn trim_only(source_path: impl Into<PathBuf>, window: ClipWindow) -> Result<Self, DomainError> {
        let request = Self {
            source_path: source_path.into(),
            window,
            target_height: None,
            bitrate: None,
            mode: TransformMode::TrimOnly,
        };
        request.validate()?;
        Ok(request)
    }

    /// Check request invariants
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.source_path.as_os_str().is_empty() {
            return Err(DomainError::BadArgs("Source path cannot be empty".to_string()));
        }
        if self.window.end_ms <= self.window.start_ms {
            return Err(DomainError::BadArgs(format!(
                "Invalid clip window {}",
                self.window
            )));
        }
        if self.target_height == Some(0) {
            return Err(DomainError::BadArgs(
                "Target height must be a positive integer".to_string(),
            ));
        }
        if self.bitrate == Some(0) {
            return Err(DomainError::BadArgs(
                "Bitrate must be a positive integer".to_string(),
            ));
        }
        if self.mode == TransformMode::TrimOnly
            && (self.target_height.is_some() || self.bitrate.is_some())
        {
            return Err(DomainError::BadArgs(
                "Resolution and bitrate are only supported when transcoding".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output frame dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Probed video track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoTrack {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
    pub bit_rate: Option<u64>,
    /// Clockwise display rotation in degrees
    pub rotation: i32,
}

impl VideoTrack {
    /// Dimensions as displayed, after applying rotation
    pub fn display_size(&self) -> FrameSize {
        if self.rotation.rem_euclid(180) == 90 {
            FrameSize {
                width: self.height,
                height: self.width,
            }
        } else {
            FrameSize {
                width: self.width,
                height: self.height,
            }
        }
    }
}

/// Probed media file information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub container: String,
    pub duration_seconds: Option<f64>,
    pub video: Option<VideoTrack>,
    pub audio_codec: Option<String>,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    /// Known duration in whole milliseconds
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_seconds
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| (d * 1000.0) as u64)
    }
}

/// Identifier of one job on a processor instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Terminal outcome of a job, produced exactly once
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeResult {
    Success(PathBuf),
    Failure { code: ErrorCode, message: String },
    Cancelled,
}

impl OutcomeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeResult::Success(_))
    }

    /// Convert into the one-shot result delivered to the caller
    pub fn into_result(self) -> Result<PathBuf, DomainError> {
        match self {
            OutcomeResult::Success(path) => Ok(path),
            OutcomeResult::Failure { code, message } => Err(match code {
                ErrorCode::NoVideoTrack => DomainError::NoVideoTrack(message),
                ErrorCode::SessionCreationFailed => DomainError::SessionCreationFailed(message),
                ErrorCode::ArgumentError => DomainError::BadArgs(message),
                _ => DomainError::ProcessingFailed(message),
            }),
            OutcomeResult::Cancelled => Err(DomainError::Cancelled),
        }
    }
}

/// Event delivered on the notification channel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChannelEvent {
    Progress { value: f64 },
    Error { code: ErrorCode, message: String },
}

impl ChannelEvent {
    pub fn progress_value(&self) -> Option<f64> {
        match self {
            ChannelEvent::Progress { value } => Some(*value),
            ChannelEvent::Error { .. } => None,
        }
    }
}

/// Returns true when both paths name the same file
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests;
