//! Video Processor Library
//!
//! Transcodes, resizes and losslessly trims video clips with ffmpeg. A job
//! reports through two views: a continuous progress channel and a one-shot
//! result. Progress arrives either as pushed percentages or as a fraction
//! sampled on a timer; both are reconciled into the same contract.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{handle_method_call, MethodCall, VideoProcessor};
pub use domain::errors::{DomainError, ErrorCode};
pub use domain::model::{ChannelEvent, MediaInfo, OutcomeResult, TransformRequest};
pub use error::{ProcessorError, ProcessorResult};

/// Initialize the FFmpeg libraries used for probing
pub fn init() -> ProcessorResult<()> {
    ffmpeg_next::init().map_err(|e| ProcessorError::FfmpegInit {
        message: e.to_string(),
    })?;

    Ok(())
}
