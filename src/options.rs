//! Tracker configuration.

use crate::classify::Thresholds;
use crate::util::{AutoTrackError, AutoTrackResult};

/// Options shared by every track an [`AutoTracker`](crate::AutoTracker) drives.
#[derive(Clone, Debug, PartialEq)]
pub struct AutoTrackOptions {
    /// Quality at or above which a match is marked automatically.
    pub good_match: f64,
    /// Quality below which a match counts as absent.
    pub possible_match: f64,
    /// Weight (0-255) of the newly matched region when evolving the template.
    pub evolve_alpha: u8,
    /// Weight (0-255) pulling the template back toward the key-frame patch.
    pub tether_alpha: u8,
    /// Extrapolate motion when placing the next search region.
    pub look_ahead: bool,
    /// Consecutive no-match frames skipped before pausing. Zero disables skipping.
    pub auto_skip_count: u32,
    /// Keep stepping even when a frame cannot be marked.
    pub never_pause: bool,
    /// Search along the video's x axis with this perpendicular spread.
    pub line_spread: Option<usize>,
    /// Default mask half-size for new key frames.
    pub mask_size: (f64, f64),
    /// Default search half-size for new key frames.
    pub search_size: (f64, f64),
    /// Smallest mask half-axis.
    pub min_mask_radius: f64,
}

impl Default for AutoTrackOptions {
    fn default() -> Self {
        Self {
            good_match: 4.0,
            possible_match: 1.0,
            evolve_alpha: 63,
            tether_alpha: 0,
            look_ahead: true,
            auto_skip_count: 2,
            never_pause: false,
            line_spread: None,
            mask_size: (9.0, 9.0),
            search_size: (40.0, 40.0),
            min_mask_radius: 4.0,
        }
    }
}

impl AutoTrackOptions {
    /// Checks threshold ranges and sizes.
    pub fn validate(&self) -> AutoTrackResult<()> {
        let in_range = |v: f64| (1.0..=10.0).contains(&v);
        if !in_range(self.good_match) || !in_range(self.possible_match) {
            return Err(AutoTrackError::InvalidOptions(
                "match thresholds must lie in [1, 10]",
            ));
        }
        if self.possible_match > self.good_match {
            return Err(AutoTrackError::InvalidOptions(
                "possible_match must not exceed good_match",
            ));
        }
        let positive = |(w, h): (f64, f64)| w > 0.0 && h > 0.0;
        if !positive(self.mask_size) || !positive(self.search_size) {
            return Err(AutoTrackError::InvalidOptions(
                "mask and search sizes must be positive",
            ));
        }
        if self.min_mask_radius.is_nan() || self.min_mask_radius <= 0.0 {
            return Err(AutoTrackError::InvalidOptions(
                "min_mask_radius must be positive",
            ));
        }
        Ok(())
    }

    /// Sets `evolve_alpha` from a 0-100 evolution rate.
    pub fn with_evolve_rate(mut self, percent: i32) -> Self {
        self.evolve_alpha = if percent >= 100 {
            255
        } else if percent <= 0 {
            0
        } else {
            (percent * 255 / 100) as u8
        };
        self
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            good: self.good_match,
            possible: self.possible_match,
        }
    }
}
