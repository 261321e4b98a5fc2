//! Video Processor CLI
//!
//! Transcodes, resizes and losslessly trims video clips with ffmpeg.
//!
//! # Usage
//!
//! ```bash
//! video-processor process --input clip.mov --start 2 --end 5 --height 480
//! video-processor trim --input clip.mov --start 2 --end 5
//! video-processor call processVideo --args '{"path":"clip.mov","startTime":0,"endTime":3}'
//! video-processor inspect --input clip.mov --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use video_processor::cli::{commands, Cli, Commands};
use video_processor::config_initialization::{
    initialize_configuration_hierarchy, log_effective_settings,
};
use video_processor::utils::logging::LoggingSystem;

/// Main entry point for the video processor CLI
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Resolve configuration, then logging from it
    let settings = initialize_configuration_hierarchy(&cli)?;
    let logging = LoggingSystem::new(settings.logging());
    logging.initialize()?;
    logging.log_system_info();
    log_effective_settings(&settings);

    video_processor::init()?;

    // Execute the requested command
    match &cli.command {
        Commands::Process(args) => {
            info!("Executing process command");
            commands::process(args, &settings, cli.json).await?;
        }
        Commands::Trim(args) => {
            info!("Executing trim command");
            commands::trim(args, &settings, cli.json).await?;
        }
        Commands::Call(args) => {
            info!("Executing call command");
            commands::call(args, &settings, cli.json).await?;
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            commands::inspect(args, cli.json).await?;
        }
    }

    info!("Video processor completed successfully");
    Ok(())
}
