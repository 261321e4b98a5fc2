use std::sync::Arc;

use tracing::info;

use crate::adapters::exec_ffmpeg::locate_ffmpeg;
use crate::adapters::{
    CallbackExportAdapter, FsLocalAdapter, PollingExportAdapter, ProbeLibavAdapter, Settings,
};
use crate::app::video_processor::VideoProcessor;
use crate::engine::{EncodingDefaults, TransformInvoker};
use crate::error::{ProcessorError, ProcessorResult};
use crate::ports::{ExportPort, FsPort, ProbePort, ProgressStrategy};

pub trait AppContainer: Send + Sync {
    fn processor(&self) -> Arc<VideoProcessor>;
    fn probe(&self) -> Arc<dyn ProbePort>;
}

/// Wires the ffmpeg-backed adapters from settings
pub struct DefaultAppContainer {
    processor: Arc<VideoProcessor>,
    probe_port: Arc<dyn ProbePort>,
}

impl DefaultAppContainer {
    /// Build the container. Must be called within a tokio runtime.
    pub fn new(settings: &Settings) -> ProcessorResult<Self> {
        settings.validate()?;

        let ffmpeg_path = locate_ffmpeg(settings.ffmpeg_path.as_deref()).map_err(|e| {
            ProcessorError::FfmpegNotFound {
                message: e.to_string(),
            }
        })?;

        let probe_port: Arc<dyn ProbePort> = Arc::new(ProbeLibavAdapter::new().map_err(|e| {
            ProcessorError::FfmpegInit {
                message: e.detail(),
            }
        })?);
        let fs_port: Arc<dyn FsPort> = Arc::new(FsLocalAdapter::new(settings.output_dir())?);
        let export_port: Arc<dyn ExportPort> = match settings.progress_strategy {
            ProgressStrategy::Callback => Arc::new(CallbackExportAdapter::new(ffmpeg_path.clone())),
            ProgressStrategy::Polling => Arc::new(PollingExportAdapter::new(ffmpeg_path.clone())),
        };

        let invoker = Arc::new(TransformInvoker::new(
            Arc::clone(&probe_port),
            export_port,
            Arc::clone(&fs_port),
            encoding_defaults(settings),
        ));
        let processor = Arc::new(VideoProcessor::new(invoker, fs_port, settings.poll_interval()));

        info!(
            ffmpeg = %ffmpeg_path.display(),
            strategy = %settings.progress_strategy,
            output_dir = %settings.output_dir().display(),
            "Application container ready"
        );

        Ok(Self {
            processor,
            probe_port,
        })
    }
}

/// Encoder defaults from settings, with thread count resolved
pub fn encoding_defaults(settings: &Settings) -> EncodingDefaults {
    EncodingDefaults {
        video_codec: settings.video_codec.clone(),
        audio_codec: settings.audio_codec.clone(),
        preset: settings.preset.clone(),
        crf: settings.crf,
        threads: settings.effective_threads(),
    }
}

impl AppContainer for DefaultAppContainer {
    fn processor(&self) -> Arc<VideoProcessor> {
        Arc::clone(&self.processor)
    }

    fn probe(&self) -> Arc<dyn ProbePort> {
        Arc::clone(&self.probe_port)
    }
}
