//! CLI module for the video processor
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// Video Processor
///
/// Transcodes, resizes and losslessly trims video clips with ffmpeg,
/// reporting progress as a console bar or JSON lines.
#[derive(Parser, Debug)]
#[command(name = "video-processor")]
#[command(about = "Video Processor - Transcode, resize and trim video clips")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file with a [processor] table
    #[arg(long, global = true, env = "VIDEO_PROCESSOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Progress strategy (callback, polling)
    #[arg(long, global = true)]
    pub strategy: Option<String>,

    /// Directory for generated outputs
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Print progress and results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcode a segment to H.264, optionally resized
    Process(args::ProcessArgs),
    /// Cut a segment without re-encoding
    Trim(args::TrimArgs),
    /// Invoke a method by name with JSON arguments
    Call(args::CallArgs),
    /// Inspect video file information
    Inspect(args::InspectArgs),
}
