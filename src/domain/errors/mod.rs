// Domain errors - Fault taxonomy surfaced to callers

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable error codes reported on both the result and the progress channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ArgumentError,
    NoVideoTrack,
    SessionCreationFailed,
    ProcessingFailed,
    ExportCancelled,
    JobInProgress,
    NotImplemented,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ArgumentError => "ARGUMENT_ERROR",
            ErrorCode::NoVideoTrack => "NO_VIDEO_TRACK",
            ErrorCode::SessionCreationFailed => "SESSION_CREATION_FAILED",
            ErrorCode::ProcessingFailed => "PROCESSING_FAILED",
            ErrorCode::ExportCancelled => "EXPORT_CANCELLED",
            ErrorCode::JobInProgress => "JOB_IN_PROGRESS",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// Malformed or missing arguments, detected before any ffmpeg call
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// Source has no decodable video stream
    #[error("No video track: {0}")]
    NoVideoTrack(String),

    /// The export could not be set up for this source and configuration
    #[error("Session creation failed: {0}")]
    SessionCreationFailed(String),

    /// The export started but failed while running
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// The export was cancelled by the caller
    #[error("Export cancelled")]
    Cancelled,

    /// Another job is still running on this processor
    #[error("A job is already in progress")]
    JobInProgress,

    /// Unknown method name
    #[error("Method not implemented: {0}")]
    NotImplemented(String),
}

impl DomainError {
    /// Error code reported to the caller
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::BadArgs(_) => ErrorCode::ArgumentError,
            DomainError::NoVideoTrack(_) => ErrorCode::NoVideoTrack,
            DomainError::SessionCreationFailed(_) => ErrorCode::SessionCreationFailed,
            DomainError::ProcessingFailed(_) => ErrorCode::ProcessingFailed,
            DomainError::Cancelled => ErrorCode::ExportCancelled,
            DomainError::JobInProgress => ErrorCode::JobInProgress,
            DomainError::NotImplemented(_) => ErrorCode::NotImplemented,
        }
    }

    /// Message without the code prefix
    pub fn detail(&self) -> String {
        match self {
            DomainError::BadArgs(message)
            | DomainError::NoVideoTrack(message)
            | DomainError::SessionCreationFailed(message)
            | DomainError::ProcessingFailed(message)
            | DomainError::NotImplemented(message) => message.clone(),
            DomainError::Cancelled | DomainError::JobInProgress => self.to_string(),
        }
    }
}
