//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the process command
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Clip start in seconds
    #[arg(short, long, allow_negative_numbers = true)]
    pub start: f64,

    /// Clip end in seconds
    #[arg(short, long, allow_negative_numbers = true)]
    pub end: f64,

    /// Output height in pixels; width follows the aspect ratio
    #[arg(long)]
    pub height: Option<u32>,

    /// Target video bitrate in bits per second
    #[arg(long)]
    pub bitrate: Option<u64>,
}

/// Arguments for the trim command
#[derive(Args, Debug)]
pub struct TrimArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Clip start in seconds
    #[arg(short, long, allow_negative_numbers = true)]
    pub start: f64,

    /// Clip end in seconds
    #[arg(short, long, allow_negative_numbers = true)]
    pub end: f64,
}

/// Arguments for the call command
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Method name (processVideo, trimVideo)
    pub method: String,

    /// Method arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,
}
