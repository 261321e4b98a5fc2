//! Command implementations

use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::adapters::toml_config::Settings;
use crate::adapters::ProbeLibavAdapter;
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::app::video_processor::{PROCESSED_PREFIX, TRIMMED_PREFIX};
use crate::app::{handle_method_call, MethodCall, VideoProcessor};
use crate::cli::args::{CallArgs, InspectArgs, ProcessArgs, TrimArgs};
use crate::domain::errors::DomainError;
use crate::domain::model::{ClipWindow, MediaInfo, TransformRequest};
use crate::output::ProgressReporter;
use crate::ports::ProbePort;

/// Execute the process command
pub async fn process(args: &ProcessArgs, settings: &Settings, json: bool) -> Result<()> {
    info!("Starting process operation");
    info!("Input: {}", args.input.display());

    // Reject bad arguments before touching ffmpeg
    let window = ClipWindow::from_seconds(args.start, args.end).map_err(domain_failure)?;
    let request = TransformRequest::transcode(&args.input, window, args.height, args.bitrate)
        .map_err(domain_failure)?;

    let container = DefaultAppContainer::new(settings)?;
    let processor = container.processor();
    let job = async { processor.start(request, PROCESSED_PREFIX).await?.wait().await.into_result() };
    drive_with_progress(&processor, json, job).await?;

    info!("Process operation completed successfully");
    Ok(())
}

/// Execute the trim command
pub async fn trim(args: &TrimArgs, settings: &Settings, json: bool) -> Result<()> {
    info!("Starting trim operation");
    info!("Input: {}", args.input.display());

    let window = ClipWindow::from_seconds(args.start, args.end).map_err(domain_failure)?;
    let request = TransformRequest::trim_only(&args.input, window).map_err(domain_failure)?;

    let container = DefaultAppContainer::new(settings)?;
    let processor = container.processor();
    let job = async { processor.start(request, TRIMMED_PREFIX).await?.wait().await.into_result() };
    drive_with_progress(&processor, json, job).await?;

    info!("Trim operation completed successfully");
    Ok(())
}

/// Execute the call command
pub async fn call(args: &CallArgs, settings: &Settings, json: bool) -> Result<()> {
    info!("Starting call operation: {}", args.method);

    let call = MethodCall::from_json(&args.method, &args.args).map_err(domain_failure)?;

    let container = DefaultAppContainer::new(settings)?;
    let processor = container.processor();
    let job = async {
        handle_method_call(&processor, call).await.map(|reply| match reply {
            Value::String(path) => PathBuf::from(path),
            other => PathBuf::from(other.to_string()),
        })
    };
    drive_with_progress(&processor, json, job).await?;
    Ok(())
}

/// Execute the inspect command
pub async fn inspect(args: &InspectArgs, json: bool) -> Result<()> {
    info!("Starting inspect operation");
    info!("Input: {}", args.input.display());

    let probe = ProbeLibavAdapter::new().map_err(domain_failure)?;
    let media_info = probe.probe_media(&args.input).await.map_err(domain_failure)?;

    if json {
        let json = serde_json::to_string_pretty(&media_info)
            .context("Failed to serialize media info to JSON")?;
        println!("{}", json);
    } else {
        display_media_info(&media_info);
    }

    info!("Inspect operation completed successfully");
    Ok(())
}

/// Render progress events until `job` resolves. The first Ctrl-C cancels
/// the running job.
async fn drive_with_progress<F>(processor: &VideoProcessor, json: bool, job: F) -> Result<PathBuf>
where
    F: Future<Output = Result<PathBuf, DomainError>>,
{
    let mut events = processor.listen();
    let mut reporter = ProgressReporter::new(json);

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(job);
    tokio::pin!(interrupt);
    let mut interrupted = false;

    let result = loop {
        tokio::select! {
            result = &mut job => break result,
            Some(event) = events.next() => reporter.on_event(&event),
            signal = &mut interrupt, if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        warn!("Interrupted; cancelling job");
                        processor.cancel();
                    }
                    Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
                }
            }
        }
    };

    // Events posted together with the result may still be queued
    processor.flush().await;
    for event in events.drain() {
        reporter.on_event(&event);
    }
    reporter.finish(&result);
    processor.stop_listening();

    result.map_err(domain_failure)
}

/// Attach the stable error code to a domain error
pub fn domain_failure(error: DomainError) -> anyhow::Error {
    anyhow::anyhow!("[{}] {}", error.code(), error.detail())
}

/// Display media information in human-readable format
fn display_media_info(media_info: &MediaInfo) {
    println!("Media Information");
    println!("=================");
    println!("File: {}", media_info.path.display());
    println!("Format: {}", media_info.container);
    match media_info.duration_seconds {
        Some(duration) => println!("Duration: {:.3}s", duration),
        None => println!("Duration: unknown"),
    }
    println!();

    match &media_info.video {
        Some(video) => {
            println!("Video:");
            println!("  {} ({} displayed)", video.codec, video.display_size());
            if let Some(rate) = video.frame_rate {
                println!("  Frame Rate: {:.2} fps", rate);
            }
            println!("  Bit Rate: {} bps", video.bit_rate.unwrap_or(0));
            println!("  Rotation: {}°", video.rotation);
        }
        None => println!("Video: none"),
    }

    match &media_info.audio_codec {
        Some(codec) => println!("Audio: {}", codec),
        None => println!("Audio: none"),
    }
}
