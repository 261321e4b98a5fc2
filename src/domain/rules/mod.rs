// Domain rules - Business logic and policies

use crate::domain::errors::*;
use crate::domain::model::*;

/// Business rules for output frame sizing
pub struct FrameSizer;

impl FrameSizer {
    /// Derive the output size for a target height, preserving the source aspect ratio.
    ///
    /// Both dimensions are rounded to the nearest even integer, as required by
    /// 4:2:0 encoders. Neither dimension drops below 2.
    pub fn scale_to_height(source: FrameSize, target_height: u32) -> Result<FrameSize, DomainError> {
        if source.width == 0 || source.height == 0 {
            return Err(DomainError::NoVideoTrack(format!(
                "Video track reports invalid dimensions {}",
                source
            )));
        }
        if target_height == 0 {
            return Err(DomainError::BadArgs(
                "Target height must be a positive integer".to_string(),
            ));
        }

        let exact_width = source.width as f64 * target_height as f64 / source.height as f64;
        Ok(FrameSize {
            width: nearest_even(exact_width),
            height: nearest_even(target_height as f64),
        })
    }
}

/// Round to the nearest even integer, halves away from zero, minimum 2
pub fn nearest_even(value: f64) -> u32 {
    let even = (value / 2.0).round() * 2.0;
    if even < 2.0 {
        2
    } else {
        even as u32
    }
}

/// Business rules for relaying export progress
pub struct ProgressRules;

impl ProgressRules {
    /// Convert a whole-number percentage into a fraction in [0, 1]
    pub fn percent_to_fraction(percent: i32) -> f32 {
        (percent as f32 / 100.0).clamp(0.0, 1.0)
    }

    /// Convert a fraction into a whole-number percentage, rounding down
    pub fn fraction_to_percent(fraction: f64) -> i32 {
        if !fraction.is_finite() {
            return 0;
        }
        (fraction * 100.0).floor().clamp(0.0, 100.0) as i32
    }

    /// Fraction of the clip window covered by `elapsed_us` of output
    pub fn window_fraction(elapsed_us: i64, window: &ClipWindow) -> f64 {
        let total_us = window.duration_ms() as f64 * 1000.0;
        if total_us <= 0.0 || elapsed_us <= 0 {
            return 0.0;
        }
        (elapsed_us as f64 / total_us).min(1.0)
    }
}

/// Clamps progress to [0, 1] and holds it monotonic non-decreasing.
///
/// Values that do not advance past the last relayed value are dropped, as are
/// NaN readings.
#[derive(Debug, Clone, Default)]
pub struct ProgressNormalizer {
    last: Option<f64>,
}

impl ProgressNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value to relay, if any
    pub fn accept(&mut self, raw: f64) -> Option<f64> {
        if raw.is_nan() {
            return None;
        }
        let value = raw.clamp(0.0, 1.0);
        match self.last {
            Some(last) if value <= last => None,
            _ => {
                self.last = Some(value);
                Some(value)
            }
        }
    }

    /// Last relayed value
    pub fn last(&self) -> Option<f64> {
        self.last
    }
}

#[cfg(test)]
mod tests;
