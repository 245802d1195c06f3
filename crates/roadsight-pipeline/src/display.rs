//! Display model: what a front end shows after each cycle.
//!
//! Pure data: three downscaled previews, formatted sensor readouts, the
//! PSNR line and the alert. Rendering (window, terminal, files) belongs to
//! the caller.

use image::imageops::{self, FilterType};
use serde::Serialize;

use crate::types::{AlertState, AlertStyle, Frame, SensorReading};

/// Text readouts for the three sensor values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorReadouts {
    /// e.g. `Temperature: 21.50 °C`
    pub temperature: String,
    /// e.g. `Humidity: 55.00 %`
    pub humidity: String,
    /// e.g. `Light Level: 30.0 lux`
    pub light: String,
}

impl SensorReadouts {
    /// Format a reading for display.
    #[must_use]
    pub fn from_reading(reading: &SensorReading) -> Self {
        Self {
            temperature: format!("Temperature: {:.2} °C", reading.temperature_celsius),
            humidity: format!("Humidity: {:.2} %", reading.humidity_percent),
            light: format!("Light Level: {:?} lux", reading.light_level),
        }
    }
}

/// Everything the display shows for one cycle.
#[derive(Debug, Clone)]
pub struct DisplayData {
    /// Downscaled captured frame.
    pub original: Frame,
    /// Downscaled noisy frame.
    pub noisy: Frame,
    /// Downscaled restored frame.
    pub restored: Frame,
    /// Sensor readouts.
    pub readouts: SensorReadouts,
    /// e.g. `PSNR (Original vs Noisy): 28.13 dB`
    pub psnr_text: String,
    /// Visibility classification.
    pub alert: AlertState,
}

impl DisplayData {
    /// Build the display model, shrinking each frame by `scale` per side.
    #[must_use]
    pub fn new(
        frames: [&Frame; 3],
        reading: &SensorReading,
        degradation_psnr: f64,
        alert: AlertState,
        scale: u32,
    ) -> Self {
        let [original, noisy, restored] = frames.map(|f| preview(f, scale));
        Self {
            original,
            noisy,
            restored,
            readouts: SensorReadouts::from_reading(reading),
            psnr_text: format!("PSNR (Original vs Noisy): {degradation_psnr:.2} dB"),
            alert,
        }
    }

    /// Alert text.
    #[must_use]
    pub const fn alert_text(&self) -> &'static str {
        self.alert.message()
    }

    /// Alert colours.
    #[must_use]
    pub const fn alert_style(&self) -> AlertStyle {
        self.alert.style()
    }
}

/// Shrink `frame` by an integer factor per side (at least one pixel per
/// side remains). A factor of 1 returns a copy.
#[must_use = "returns the preview frame"]
pub fn preview(frame: &Frame, scale: u32) -> Frame {
    let scale = scale.max(1);
    if scale == 1 || frame.width() == 0 || frame.height() == 0 {
        return frame.clone();
    }
    let width = (frame.width() / scale).max(1);
    let height = (frame.height() / scale).max(1);
    imageops::resize(frame, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readouts_match_display_format() {
        let readouts = SensorReadouts::from_reading(&SensorReading::new(30.0, 21.5, 55.0));
        assert_eq!(readouts.temperature, "Temperature: 21.50 °C");
        assert_eq!(readouts.humidity, "Humidity: 55.00 %");
        assert_eq!(readouts.light, "Light Level: 30.0 lux");
    }

    #[test]
    fn whole_light_levels_keep_their_decimal_point() {
        let readouts = SensorReadouts::from_reading(&SensorReading::new(1000.0, 0.0, 0.0));
        assert_eq!(readouts.light, "Light Level: 1000.0 lux");
        let readouts = SensorReadouts::from_reading(&SensorReading::new(0.0, 0.0, 0.0));
        assert_eq!(readouts.light, "Light Level: 0.0 lux");
    }

    #[test]
    fn fractional_light_is_shown_as_read() {
        let readouts = SensorReadouts::from_reading(&SensorReading::new(412.5, 0.0, 0.0));
        assert_eq!(readouts.light, "Light Level: 412.5 lux");
    }

    #[test]
    fn previews_are_a_third_of_each_side() {
        let frame = Frame::new(640, 480);
        let p = preview(&frame, 3);
        assert_eq!(p.dimensions(), (213, 160));
    }

    #[test]
    fn tiny_frames_keep_one_pixel() {
        let frame = Frame::new(2, 2);
        assert_eq!(preview(&frame, 3).dimensions(), (1, 1));
    }

    #[test]
    fn unit_scale_is_a_copy() {
        let frame = Frame::from_pixel(5, 4, image::Rgb([1, 2, 3]));
        assert_eq!(preview(&frame, 1), frame);
    }

    #[test]
    fn uniform_frames_stay_uniform_when_shrunk() {
        let frame = Frame::from_pixel(9, 9, image::Rgb([128, 64, 32]));
        let p = preview(&frame, 3);
        assert!(p.pixels().all(|px| px.0 == [128, 64, 32]));
    }

    #[test]
    fn display_data_carries_psnr_and_alert() {
        let frame = Frame::from_pixel(6, 6, image::Rgb([10, 10, 10]));
        let data = DisplayData::new(
            [&frame, &frame, &frame],
            &SensorReading::new(100.0, 20.0, 50.0),
            28.126,
            AlertState::PoorVisibility,
            3,
        );
        assert_eq!(data.psnr_text, "PSNR (Original vs Noisy): 28.13 dB");
        assert_eq!(data.alert_text(), "Poor Visibility Detected! Drive with Caution");
        assert_eq!(data.alert_style().background, "yellow");
        assert_eq!(data.original.dimensions(), (2, 2));
    }
}
