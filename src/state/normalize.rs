//! Normalized UI parameters
//!
//! User interfaces drive effect parameters with values in `[0, 1]`. Integer
//! parameters map linearly onto their valid range; the pre-amp level maps
//! logarithmically over a 40 dB window.

use std::fmt;
use std::ops::RangeInclusive;

use num_traits::{cast, PrimInt};

use crate::error::{Result, SegueError};

/// Linear mapping between `[0, 1]` and an integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearNormalizer<T> {
    min: T,
    max: T,
}

impl<T: PrimInt + fmt::Display> LinearNormalizer<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn from_range(range: &RangeInclusive<T>) -> Self {
        Self::new(*range.start(), *range.end())
    }

    fn as_f32(value: T) -> f32 {
        value.to_f32().unwrap_or_default()
    }

    /// Position of `value` within the range. A degenerate range maps to 0.
    pub fn normalize(&self, value: T) -> f32 {
        if self.max == self.min {
            return 0.0;
        }
        let min = Self::as_f32(self.min);
        (Self::as_f32(value) - min) / (Self::as_f32(self.max) - min)
    }

    /// Value at `normalized` within the range, truncated toward zero.
    pub fn denormalize(&self, name: &str, normalized: f32) -> Result<T> {
        if !(0.0..=1.0).contains(&normalized) {
            return Err(SegueError::invalid_argument(
                name,
                format!("normalized value {} is outside 0..=1", normalized),
            ));
        }
        let min = Self::as_f32(self.min);
        let raw = normalized * (Self::as_f32(self.max) - min) + min;
        cast::<f32, T>(raw.trunc())
            .map(|v| v.max(self.min).min(self.max))
            .ok_or_else(|| {
                SegueError::invalid_argument(name, format!("{} does not fit the range", raw))
            })
    }
}

/// Width of the pre-amp UI scale in decibels.
pub const PREAMP_UI_RANGE_DB: f64 = 40.0;

/// Linear pre-amp level for a UI position; 1.0 is unity gain and anything at
/// or below 0 mutes.
pub fn preamp_level_from_ui(ui: f32) -> f32 {
    if ui <= 0.0 {
        return 0.0;
    }
    10f64.powf(PREAMP_UI_RANGE_DB * (f64::from(ui) - 1.0) / 20.0) as f32
}

/// Inverse of [`preamp_level_from_ui`].
pub fn preamp_level_to_ui(level: f32) -> f32 {
    if level <= 0.0 {
        return 0.0;
    }
    (f64::from(level).log10() * 20.0 / PREAMP_UI_RANGE_DB + 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_round_trip_points() {
        let n = LinearNormalizer::new(0i16, 1000);
        assert_eq!(n.denormalize("strength", 0.0).unwrap(), 0);
        assert_eq!(n.denormalize("strength", 0.5).unwrap(), 500);
        assert_eq!(n.denormalize("strength", 1.0).unwrap(), 1000);
        assert_relative_eq!(n.normalize(250), 0.25);
    }

    #[test]
    fn test_negative_range() {
        let n = LinearNormalizer::new(-1500i16, 1500);
        assert_eq!(n.denormalize("band_level", 0.5).unwrap(), 0);
        assert_eq!(n.denormalize("band_level", 0.0).unwrap(), -1500);
        assert_relative_eq!(n.normalize(-750), 0.25);
    }

    #[test]
    fn test_out_of_unit_range_rejected() {
        let n = LinearNormalizer::new(100i32, 7000);
        assert!(n.denormalize("decay_time", 1.01).is_err());
        assert!(n.denormalize("decay_time", -0.1).is_err());
        assert!(n.denormalize("decay_time", f32::NAN).is_err());
    }

    #[test]
    fn test_degenerate_range() {
        let n = LinearNormalizer::new(0i32, 0);
        assert_eq!(n.normalize(0), 0.0);
        assert_eq!(n.denormalize("reverb_delay", 0.7).unwrap(), 0);
    }

    #[test]
    fn test_preamp_ui_mapping() {
        assert_relative_eq!(preamp_level_from_ui(1.0), 1.0);
        assert_relative_eq!(preamp_level_from_ui(0.5), 0.1, epsilon = 1e-6);
        assert_relative_eq!(preamp_level_from_ui(1.5), 10.0, epsilon = 1e-4);
        assert_eq!(preamp_level_from_ui(0.0), 0.0);
        assert_eq!(preamp_level_from_ui(-1.0), 0.0);

        assert_relative_eq!(preamp_level_to_ui(0.1), 0.5, epsilon = 1e-6);
        assert_eq!(preamp_level_to_ui(0.0), 0.0);
    }
}
