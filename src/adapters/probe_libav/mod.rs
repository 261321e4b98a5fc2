// Probe LibAV adapter - Media file analysis using libav

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ffmpeg_next as ffmpeg;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// LibAV-based media probing adapter
pub struct ProbeLibavAdapter;

impl ProbeLibavAdapter {
    /// Create new LibAV probing adapter
    pub fn new() -> Result<Self, DomainError> {
        ffmpeg::init().map_err(|e| {
            DomainError::SessionCreationFailed(format!("Failed to initialize FFmpeg: {}", e))
        })?;
        Ok(Self)
    }

    /// Blocking probe; run off the async executor
    fn probe_blocking(path: PathBuf) -> Result<MediaInfo, DomainError> {
        if !path.is_file() {
            return Err(DomainError::SessionCreationFailed(format!(
                "Source file not found: {}",
                path.display()
            )));
        }

        let ictx = ffmpeg::format::input(&path).map_err(|e| {
            DomainError::SessionCreationFailed(format!(
                "Failed to open {}: {}",
                path.display(),
                e
            ))
        })?;

        let duration_seconds = match ictx.duration() {
            d if d == ffmpeg::ffi::AV_NOPTS_VALUE || d <= 0 => None,
            d => Some(d as f64 / ffmpeg::ffi::AV_TIME_BASE as f64),
        };

        let video = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .map(|stream| Self::read_video_track(&stream));

        let audio_codec = ictx
            .streams()
            .best(ffmpeg::media::Type::Audio)
            .map(|stream| stream.parameters().id().name().to_string());

        let info = MediaInfo {
            path,
            container: ictx.format().name().to_string(),
            duration_seconds,
            video,
            audio_codec,
        };
        debug!(
            container = %info.container,
            duration = ?info.duration_seconds,
            has_video = info.has_video(),
            "Probe complete"
        );
        Ok(info)
    }

    fn read_video_track(stream: &ffmpeg::Stream) -> VideoTrack {
        let codec = stream.parameters().id().name().to_string();
        let frame_rate = rational_to_f64(stream.avg_frame_rate());
        let rotation = stream
            .metadata()
            .get("rotate")
            .and_then(|value| value.trim().parse::<i32>().ok())
            .map(normalize_rotation)
            .unwrap_or(0);

        let decoded = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video());

        let (width, height, bit_rate) = match decoded {
            Ok(decoder) => (
                decoder.width(),
                decoder.height(),
                match decoder.bit_rate() {
                    0 => None,
                    rate => Some(rate as u64),
                },
            ),
            Err(e) => {
                warn!("Cannot open {} decoder to read dimensions: {}", codec, e);
                (0, 0, None)
            }
        };

        VideoTrack {
            codec,
            width,
            height,
            frame_rate,
            bit_rate,
            rotation,
        }
    }
}

#[async_trait]
impl ProbePort for ProbeLibavAdapter {
    async fn probe_media(&self, file_path: &Path) -> Result<MediaInfo, DomainError> {
        info!("Probing media file: {}", file_path.display());
        let path = file_path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::probe_blocking(path))
            .await
            .map_err(|e| DomainError::SessionCreationFailed(format!("Probe task failed: {}", e)))?
    }
}

fn rational_to_f64(rate: ffmpeg::Rational) -> Option<f64> {
    if rate.denominator() == 0 || rate.numerator() <= 0 {
        None
    } else {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    }
}

/// Map any rotation in degrees into [0, 360)
fn normalize_rotation(degrees: i32) -> i32 {
    degrees.rem_euclid(360)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(90), 90);
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(0), 0);
    }

    #[test]
    fn test_rational_to_f64() {
        assert_eq!(rational_to_f64(ffmpeg::Rational::new(30, 1)), Some(30.0));
        assert_eq!(rational_to_f64(ffmpeg::Rational::new(0, 0)), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_session_failure() {
        let adapter = ProbeLibavAdapter::new().unwrap();
        let err = adapter
            .probe_media(Path::new("/nonexistent/clip.mp4"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SessionCreationFailed);
    }

    #[tokio::test]
    async fn test_garbage_file_is_session_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"definitely not a video").unwrap();

        let adapter = ProbeLibavAdapter::new().unwrap();
        let err = adapter.probe_media(&path).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SessionCreationFailed);
    }
}
