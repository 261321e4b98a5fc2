// Unit tests for business rules

use super::*;

#[test]
fn test_scale_1080p_to_480() {
    let size = FrameSizer::scale_to_height(FrameSize { width: 1920, height: 1080 }, 480).unwrap();
    assert_eq!(size, FrameSize { width: 854, height: 480 });
}

#[test]
fn test_scale_rounds_odd_width_to_nearest_even() {
    // 640x360 at height 270 -> width 480 exactly
    let size = FrameSizer::scale_to_height(FrameSize { width: 640, height: 360 }, 270).unwrap();
    assert_eq!(size, FrameSize { width: 480, height: 270 });

    // 1000x750 at height 301: width 401.33 -> 402, height 301 -> 302
    let size = FrameSizer::scale_to_height(FrameSize { width: 1000, height: 750 }, 301).unwrap();
    assert_eq!(size.width % 2, 0);
    assert_eq!(size.height % 2, 0);
    assert_eq!(size, FrameSize { width: 402, height: 302 });

    // 720x1280 portrait at 480: 270 exactly
    let size = FrameSizer::scale_to_height(FrameSize { width: 720, height: 1280 }, 480).unwrap();
    assert_eq!(size, FrameSize { width: 270, height: 480 });
}

#[test]
fn test_scale_never_below_two() {
    let size = FrameSizer::scale_to_height(FrameSize { width: 10, height: 1000 }, 2).unwrap();
    assert_eq!(size, FrameSize { width: 2, height: 2 });
}

#[test]
fn test_scale_rejects_degenerate_input() {
    let err = FrameSizer::scale_to_height(FrameSize { width: 0, height: 1080 }, 480).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoVideoTrack);

    let err = FrameSizer::scale_to_height(FrameSize { width: 1920, height: 1080 }, 0).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ArgumentError);
}

#[test]
fn test_nearest_even() {
    assert_eq!(nearest_even(853.33), 854);
    assert_eq!(nearest_even(853.0), 854);
    assert_eq!(nearest_even(852.9), 852);
    assert_eq!(nearest_even(481.0), 482);
    assert_eq!(nearest_even(0.4), 2);
}

#[test]
fn test_percent_to_fraction_clamps() {
    assert_eq!(ProgressRules::percent_to_fraction(0), 0.0);
    assert_eq!(ProgressRules::percent_to_fraction(50), 0.5);
    assert_eq!(ProgressRules::percent_to_fraction(100), 1.0);
    assert_eq!(ProgressRules::percent_to_fraction(140), 1.0);
    assert_eq!(ProgressRules::percent_to_fraction(-5), 0.0);
}

#[test]
fn test_fraction_to_percent() {
    assert_eq!(ProgressRules::fraction_to_percent(0.499), 49);
    assert_eq!(ProgressRules::fraction_to_percent(1.3), 100);
    assert_eq!(ProgressRules::fraction_to_percent(f64::NAN), 0);
}

#[test]
fn test_window_fraction() {
    let window = ClipWindow::new(2_000, 5_000).unwrap();
    assert_eq!(ProgressRules::window_fraction(0, &window), 0.0);
    assert!((ProgressRules::window_fraction(1_500_000, &window) - 0.5).abs() < 1e-9);
    assert_eq!(ProgressRules::window_fraction(9_000_000, &window), 1.0);
    assert_eq!(ProgressRules::window_fraction(-10, &window), 0.0);
}

#[test]
fn test_normalizer_clamps_and_holds_monotonic() {
    let mut normalizer = ProgressNormalizer::new();
    assert_eq!(normalizer.accept(-0.2), Some(0.0));
    assert_eq!(normalizer.accept(0.3), Some(0.3));
    assert_eq!(normalizer.accept(0.25), None);
    assert_eq!(normalizer.accept(0.3), None);
    assert_eq!(normalizer.accept(f64::NAN), None);
    assert_eq!(normalizer.accept(1.7), Some(1.0));
    assert_eq!(normalizer.accept(1.0), None);
    assert_eq!(normalizer.last(), Some(1.0));
}
