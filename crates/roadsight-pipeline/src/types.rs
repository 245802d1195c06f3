//! Shared types for the roadsight processing pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::restore::RestorerKind;

/// Re-export `RgbImage` so downstream crates can reference frames
/// without depending on `image` directly.
pub use image::RgbImage;

/// A captured camera frame: 8-bit RGB, dimensions fixed for one cycle.
pub type Frame = RgbImage;

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of the given frame.
    #[must_use]
    pub fn of(frame: &Frame) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
        }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns `true` if either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One environmental sensor sample.
///
/// A reading is either fully valid or absent: the parser never yields a
/// partially populated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Ambient light in lux (nominally 0 to 1000).
    pub light_level: f64,
    /// Temperature in degrees Celsius.
    pub temperature_celsius: f64,
    /// Relative humidity in percent.
    pub humidity_percent: f64,
}

impl SensorReading {
    /// Create a reading from its three fields.
    #[must_use]
    pub const fn new(light_level: f64, temperature_celsius: f64, humidity_percent: f64) -> Self {
        Self {
            light_level,
            temperature_celsius,
            humidity_percent,
        }
    }

    /// The raw `(light, temperature, humidity)` triple in wire order.
    #[must_use]
    pub const fn as_triple(&self) -> [f64; 3] {
        [
            self.light_level,
            self.temperature_celsius,
            self.humidity_percent,
        ]
    }
}

/// Parameters used to degrade a frame for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegradationParameters {
    /// Multiplier applied to every channel before contrast.
    pub brightness_factor: f32,
    /// Contrast gain around mid-gray (127.5).
    pub contrast_factor: f32,
    /// Standard deviation of the injected Gaussian noise.
    pub noise_sigma: f64,
}

/// Binary visibility classification derived from a PSNR score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertState {
    /// Quality at or above the threshold.
    Clear,
    /// Quality below the threshold.
    PoorVisibility,
}

/// Foreground/background colour pair for rendering an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertStyle {
    /// Text colour name.
    pub foreground: &'static str,
    /// Background colour name.
    pub background: &'static str,
}

impl AlertState {
    /// Driver-facing message for this state.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Clear => "Visibility is clear. Drive safely",
            Self::PoorVisibility => "Poor Visibility Detected! Drive with Caution",
        }
    }

    /// Visual style; the two states never share a style.
    #[must_use]
    pub const fn style(self) -> AlertStyle {
        match self {
            Self::Clear => AlertStyle {
                foreground: "green",
                background: "lightgreen",
            },
            Self::PoorVisibility => AlertStyle {
                foreground: "red",
                background: "yellow",
            },
        }
    }

    /// Returns `true` for [`PoorVisibility`](Self::PoorVisibility).
    #[must_use]
    pub const fn is_alert(self) -> bool {
        matches!(self, Self::PoorVisibility)
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Configuration for the processing pipeline.
///
/// Passed explicitly into [`CycleProcessor::new`](crate::CycleProcessor::new)
/// and validated there. All parameters default to the values the
/// capture loop has always used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Standard deviation of the injected Gaussian noise (the
    /// "degradation level"). Independent of the light level.
    pub noise_sigma: f64,

    /// PSNR (dB) below which a cycle raises a poor-visibility alert.
    pub alert_threshold: f64,

    /// Which restoration strategy to apply to the noisy frame.
    pub restorer: RestorerKind,

    /// Integer factor by which display previews are shrunk per side.
    pub preview_scale: u32,
}

impl PipelineConfig {
    /// Default noise sigma.
    pub const DEFAULT_NOISE_SIGMA: f64 = 25.0;
    /// Default alert threshold in dB.
    pub const DEFAULT_ALERT_THRESHOLD: f64 = 30.0;
    /// Default preview downscale factor.
    pub const DEFAULT_PREVIEW_SCALE: u32 = 3;

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.noise_sigma.is_finite() || self.noise_sigma < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "noise_sigma must be finite and non-negative, got {}",
                self.noise_sigma
            )));
        }
        if !self.alert_threshold.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "alert_threshold must be finite, got {}",
                self.alert_threshold
            )));
        }
        if self.preview_scale == 0 {
            return Err(PipelineError::InvalidConfig(
                "preview_scale must be at least 1".to_string(),
            ));
        }
        self.restorer.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            noise_sigma: Self::DEFAULT_NOISE_SIGMA,
            alert_threshold: Self::DEFAULT_ALERT_THRESHOLD,
            restorer: RestorerKind::default(),
            preview_scale: Self::DEFAULT_PREVIEW_SCALE,
        }
    }
}

/// Errors that can occur while processing a cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// A frame with zero width or height was supplied.
    #[error("frame has no pixels")]
    EmptyFrame,

    /// Two frames that must be compared have different shapes.
    #[error("frame dimensions differ: {left} vs {right}")]
    DimensionMismatch {
        /// Shape of the first frame.
        left: Dimensions,
        /// Shape of the second frame.
        right: Dimensions,
    },

    /// The light level cannot be mapped to a bucket.
    #[error("light level {0} is not a finite number")]
    InvalidLightLevel(f64),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}
