// Unit tests for domain models

use super::*;

#[test]
fn test_clip_window_from_seconds_truncates() {
    let window = ClipWindow::from_seconds(2.0, 5.0009).unwrap();
    assert_eq!(window.start_ms, 2000);
    assert_eq!(window.end_ms, 5000);
    assert_eq!(window.duration_ms(), 3000);
    assert!((window.duration_seconds() - 3.0).abs() < f64::EPSILON);
}

#[test]
fn test_clip_window_rejects_inverted_range() {
    let err = ClipWindow::from_seconds(5.0, 2.0).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ArgumentError);

    let err = ClipWindow::new(1000, 1000).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ArgumentError);
}

#[test]
fn test_clip_window_rejects_negative_and_nan() {
    assert!(ClipWindow::from_seconds(-1.0, 2.0).is_err());
    assert!(ClipWindow::from_seconds(0.0, f64::NAN).is_err());
    assert!(ClipWindow::from_seconds(0.0, f64::INFINITY).is_err());
}

#[test]
fn test_transcode_request_validation() {
    let window = ClipWindow::new(0, 10_000).unwrap();

    let request = TransformRequest::transcode("in.mp4", window, Some(480), Some(2_000_000)).unwrap();
    assert_eq!(request.mode, TransformMode::Transcode);
    assert_eq!(request.target_height, Some(480));

    assert!(TransformRequest::transcode("in.mp4", window, Some(0), None).is_err());
    assert!(TransformRequest::transcode("in.mp4", window, None, Some(0)).is_err());
    assert!(TransformRequest::transcode("", window, None, None).is_err());
}

#[test]
fn test_trim_request_rejects_transcode_options() {
    let window = ClipWindow::new(0, 10_000).unwrap();
    let mut request = TransformRequest::trim_only("in.mp4", window).unwrap();
    assert_eq!(request.mode, TransformMode::TrimOnly);

    request.target_height = Some(720);
    let err = request.validate().unwrap_err();
    assert_eq!(err.code(), ErrorCode::ArgumentError);
}

#[test]
fn test_display_size_swaps_for_rotation() {
    let mut track = VideoTrack {
        codec: "h264".to_string(),
        width: 1920,
        height: 1080,
        frame_rate: Some(30.0),
        bit_rate: None,
        rotation: 90,
    };
    assert_eq!(track.display_size(), FrameSize { width: 1080, height: 1920 });

    track.rotation = -90;
    assert_eq!(track.display_size(), FrameSize { width: 1080, height: 1920 });

    track.rotation = 180;
    assert_eq!(track.display_size(), FrameSize { width: 1920, height: 1080 });
}

#[test]
fn test_outcome_into_result() {
    let ok = OutcomeResult::Success(PathBuf::from("out.mp4")).into_result();
    assert_eq!(ok.unwrap(), PathBuf::from("out.mp4"));

    let err = OutcomeResult::Failure {
        code: ErrorCode::ProcessingFailed,
        message: "encoder exploded".to_string(),
    }
    .into_result()
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProcessingFailed);

    let err = OutcomeResult::Cancelled.into_result().unwrap_err();
    assert_eq!(err.code(), ErrorCode::ExportCancelled);
}

#[test]
fn test_channel_event_json_shape() {
    let event = ChannelEvent::Error {
        code: ErrorCode::ProcessingFailed,
        message: "boom".to_string(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "error");
    assert_eq!(json["code"], "PROCESSING_FAILED");

    let json = serde_json::to_value(ChannelEvent::Progress { value: 0.5 }).unwrap();
    assert_eq!(json["event"], "progress");
    assert_eq!(json["value"], 0.5);
}

#[test]
fn test_media_info_duration_ms() {
    let info = MediaInfo {
        path: PathBuf::from("a.mp4"),
        container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        duration_seconds: Some(10.0),
        video: None,
        audio_codec: None,
    };
    assert_eq!(info.duration_ms(), Some(10_000));
    assert!(!info.has_video());

    let unknown = MediaInfo {
        duration_seconds: Some(f64::NAN),
        ..info
    };
    assert_eq!(unknown.duration_ms(), None);
}
