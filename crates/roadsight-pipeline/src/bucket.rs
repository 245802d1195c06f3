//! Light-level buckets and the degradation parameters they select.
//!
//! Three fixed ranges partition the sensor's light scale. Comparisons are
//! strict, so the edge values 50 and 200 fall into the upper bucket.

use serde::{Deserialize, Serialize};

use crate::types::{DegradationParameters, PipelineError};

/// Upper (exclusive) bound of the dark bucket, in lux.
pub const DARK_LIMIT: f64 = 50.0;

/// Upper (exclusive) bound of the normal bucket, in lux.
pub const BRIGHT_LIMIT: f64 = 200.0;

/// Largest light level the sensor reports.
pub const MAX_LIGHT_LEVEL: f64 = 1000.0;

/// One of the three light-level ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightBucket {
    /// `level < 50`: boost brightness and contrast.
    Dark,
    /// `50 <= level < 200`: leave the frame as captured.
    Normal,
    /// `level >= 200`: dim and flatten.
    Bright,
}

impl LightBucket {
    /// Classify a (finite) light level. First match wins.
    #[must_use]
    pub fn for_level(level: f64) -> Self {
        if level < DARK_LIMIT {
            Self::Dark
        } else if level < BRIGHT_LIMIT {
            Self::Normal
        } else {
            Self::Bright
        }
    }

    /// `(brightness, contrast)` factors for this bucket.
    #[must_use]
    pub const fn factors(self) -> (f32, f32) {
        match self {
            Self::Dark => (1.5, 1.2),
            Self::Normal => (1.0, 1.0),
            Self::Bright => (0.8, 0.8),
        }
    }

    /// Short lowercase name, used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Normal => "normal",
            Self::Bright => "bright",
        }
    }
}

/// Select brightness/contrast factors for `light_level` and pair them with
/// the process-wide `noise_sigma`.
///
/// Finite levels outside `[0, 1000]` are clamped into range (with a
/// warning). Clamping never changes which bucket a level falls into.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidLightLevel`] if `light_level` is NaN or
/// infinite.
pub fn select_parameters(
    light_level: f64,
    noise_sigma: f64,
) -> Result<DegradationParameters, PipelineError> {
    if !light_level.is_finite() {
        return Err(PipelineError::InvalidLightLevel(light_level));
    }

    let level = light_level.clamp(0.0, MAX_LIGHT_LEVEL);
    if (level - light_level).abs() > 0.0 {
        log::warn!("light level {light_level} outside [0, {MAX_LIGHT_LEVEL}], clamped to {level}");
    }

    let (brightness_factor, contrast_factor) = LightBucket::for_level(level).factors();
    Ok(DegradationParameters {
        brightness_factor,
        contrast_factor,
        noise_sigma,
    })
}
