//! Cycle diagnostics: per-stage timing and metrics.
//!
//! Every call to [`CycleProcessor::process_one_cycle`](crate::CycleProcessor::process_one_cycle)
//! collects diagnostics alongside its results. Time is read through the
//! [`Clock`] trait so tests can run against a fixed clock; [`SystemClock`]
//! uses the `web-time` crate, which falls back to `std::time` on native
//! targets.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bucket::LightBucket;

/// Source of monotonic instants and wall-clock timestamps.
pub trait Clock {
    /// Opaque monotonic instant.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;

    /// Seconds since the Unix epoch, with sub-second precision.
    fn unix_seconds(&self) -> f64;
}

/// [`Clock`] backed by the system clocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }

    fn unix_seconds(&self) -> f64 {
        web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64())
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleDiagnostics {
    /// Stage 1: brightness/contrast adjustment.
    pub adjust: StageDiagnostics,
    /// Stage 2: noise injection.
    pub noise: StageDiagnostics,
    /// Stage 3: restoration.
    pub restore: StageDiagnostics,
    /// Stage 4: quality assessment.
    pub assess: StageDiagnostics,
    /// Total wall-clock duration of the cycle (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Frame width in pixels.
    pub frame_width: u32,
    /// Frame height in pixels.
    pub frame_height: u32,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Brightness/contrast adjustment.
    Adjust {
        /// Bucket the light level fell into.
        bucket: LightBucket,
        /// Brightness factor applied.
        brightness: f32,
        /// Contrast factor applied.
        contrast: f32,
        /// Mean channel value before adjustment.
        mean_before: f64,
        /// Mean channel value after adjustment.
        mean_after: f64,
    },
    /// Noise injection.
    Noise {
        /// Noise standard deviation.
        sigma: f64,
        /// Fraction of channels the noise pushed to 0 or 255.
        clipped_fraction: f64,
    },
    /// Restoration.
    Restore {
        /// Which restorer ran.
        strategy: String,
    },
    /// Quality assessment.
    Assess {
        /// PSNR original vs noisy (dB).
        degradation_psnr: f64,
        /// PSNR original vs restored (dB).
        restoration_psnr: f64,
        /// Threshold used for the alert.
        threshold: f64,
    },
}

impl CycleDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Cycle Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!("Frame: {}x{}", self.frame_width, self.frame_height));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(72));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in [
            ("Adjust", &self.adjust),
            ("Noise", &self.noise),
            ("Restore", &self.restore),
            ("Assess", &self.assess),
        ] {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Adjust {
            bucket,
            brightness,
            contrast,
            mean_before,
            mean_after,
        } => format!(
            "{} b={brightness:.2} c={contrast:.2} mean {mean_before:.1}->{mean_after:.1}",
            bucket.name(),
        ),
        StageMetrics::Noise {
            sigma,
            clipped_fraction,
        } => format!(
            "sigma={sigma:.2} clipped={:.1}%",
            clipped_fraction * 100.0
        ),
        StageMetrics::Restore { strategy } => strategy.clone(),
        StageMetrics::Assess {
            degradation_psnr,
            restoration_psnr,
            threshold,
        } => format!(
            "noisy={degradation_psnr:.2}dB restored={restoration_psnr:.2}dB threshold={threshold:.1}dB"
        ),
    }
}

/// Mean channel value of a frame.
pub(crate) fn mean_channel(frame: &crate::Frame) -> f64 {
    let raw = frame.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    let sum: u64 = raw.iter().map(|&v| u64::from(v)).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / raw.len() as f64;
    mean
}

/// Fraction of channels that sit at 0 or 255 in `after` but not in `before`.
///
/// Channels already saturated before the noise do not count.
pub(crate) fn clipped_fraction(before: &crate::Frame, after: &crate::Frame) -> f64 {
    let after = after.as_raw();
    if after.is_empty() {
        return 0.0;
    }
    let count = before
        .as_raw()
        .iter()
        .zip(after)
        .filter(|&(&b, &a)| (a == 0 || a == u8::MAX) && a != b)
        .count();
    #[allow(clippy::cast_precision_loss)]
    let fraction = count as f64 / after.len() as f64;
    fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(ms: u64, metrics: StageMetrics) -> StageDiagnostics {
        StageDiagnostics {
            duration: Duration::from_millis(ms),
            metrics,
        }
    }

    fn sample() -> CycleDiagnostics {
        CycleDiagnostics {
            adjust: stage(
                2,
                StageMetrics::Adjust {
                    bucket: LightBucket::Dark,
                    brightness: 1.5,
                    contrast: 1.2,
                    mean_before: 80.0,
                    mean_after: 120.0,
                },
            ),
            noise: stage(
                3,
                StageMetrics::Noise {
                    sigma: 25.0,
                    clipped_fraction: 0.02,
                },
            ),
            restore: stage(
                40,
                StageMetrics::Restore {
                    strategy: "nl-means".to_string(),
                },
            ),
            assess: stage(
                1,
                StageMetrics::Assess {
                    degradation_psnr: 20.5,
                    restoration_psnr: 27.1,
                    threshold: 30.0,
                },
            ),
            total_duration: Duration::from_millis(500),
            frame_width: 640,
            frame_height: 480,
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn report_lists_every_stage() {
        let report = sample().report();
        assert!(report.contains("Cycle Diagnostics Report"));
        assert!(report.contains("Frame: 640x480"));
        for name in ["Adjust", "Noise", "Restore", "Assess"] {
            assert!(report.contains(name), "missing {name}");
        }
        assert!(report.contains("nl-means"));
        assert!(report.contains("dark b=1.50 c=1.20"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!((json["total_duration"].as_f64().unwrap() - 0.5).abs() < 1e-12);
        let back: CycleDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.total_duration, Duration::from_millis(500));
    }

    #[test]
    fn mean_of_frame() {
        let mut frame = crate::Frame::from_pixel(2, 1, image::Rgb([10, 20, 30]));
        frame.put_pixel(1, 0, image::Rgb([0, 255, 30]));
        assert!((mean_channel(&frame) - 57.5).abs() < 1e-12);
    }

    #[test]
    fn only_channels_the_noise_saturated_count_as_clipped() {
        let mut before = crate::Frame::from_pixel(2, 1, image::Rgb([255, 20, 30]));
        before.put_pixel(1, 0, image::Rgb([0, 128, 250]));
        let mut after = crate::Frame::from_pixel(2, 1, image::Rgb([255, 0, 31]));
        after.put_pixel(1, 0, image::Rgb([0, 128, 255]));
        // (0,0).r and (1,0).r were saturated already; (0,0).g and (1,0).b are new.
        assert!((clipped_fraction(&before, &after) - 2.0 / 6.0).abs() < 1e-12);
        assert!(clipped_fraction(&before, &before).abs() < 1e-12);
    }

    #[test]
    fn empty_frames_clip_nothing() {
        let empty = crate::Frame::new(0, 0);
        assert!(clipped_fraction(&empty, &empty).abs() < 1e-12);
    }

    #[test]
    fn system_clock_reports_a_recent_timestamp() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.unix_seconds() > 1_577_836_800.0);
        let start = SystemClock.now();
        assert!(SystemClock.elapsed(&start) < Duration::from_secs(60));
    }
}
