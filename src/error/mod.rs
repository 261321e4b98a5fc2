//! Error handling module for the video processor

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Setup and runtime errors outside a single transform
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// No usable ffmpeg executable
    #[error("ffmpeg executable not found: {message}")]
    FfmpegNotFound { message: String },

    /// FFmpeg library initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    FfmpegInit { message: String },

    /// Subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// Transform error with a stable code
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Result type alias for processor setup operations
pub type ProcessorResult<T> = std::result::Result<T, ProcessorError>;
