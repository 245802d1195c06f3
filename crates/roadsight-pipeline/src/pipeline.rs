//! One capture-and-process cycle.
//!
//! [`CycleProcessor`] owns the configuration, the noise source, the clock
//! and the restorer, and turns a `(reading, frame)` pair into everything the display
//! and the session log need:
//!
//! ```rust
//! # use roadsight_pipeline::{CycleProcessor, Frame, PipelineConfig, PipelineError,
//! #     RestorerKind, SensorReading, SystemClock, ZeroGaussian};
//! # fn run() -> Result<(), PipelineError> {
//! let config = PipelineConfig {
//!     noise_sigma: 0.0,
//!     restorer: RestorerKind::Identity,
//!     ..PipelineConfig::default()
//! };
//! let mut processor = CycleProcessor::new(config, ZeroGaussian, SystemClock)?;
//! let frame = Frame::from_pixel(4, 4, image::Rgb([128, 128, 128]));
//! let output = processor.process_one_cycle(&SensorReading::new(100.0, 20.0, 50.0), &frame)?;
//! assert!(!output.alert.is_alert());
//! # Ok(())
//! # }
//! ```
//!
//! Nothing here touches a widget, a device or a file; the caller renders
//! [`CycleOutput::display`] and appends [`CycleOutput::log_record`].
//!
//! The restorer defaults to the [`RestorerKind`] named in the config. Any
//! other [`Restorer`] can be supplied with
//! [`CycleProcessor::with_restorer`].

use crate::brightness::adjust_brightness_contrast;
use crate::bucket::{LightBucket, select_parameters};
use crate::diagnostics::{
    Clock, CycleDiagnostics, StageDiagnostics, StageMetrics, clipped_fraction, mean_channel,
};
use crate::display::DisplayData;
use crate::noise::{GaussianSource, add_gaussian_noise};
use crate::quality::{classify, psnr, round_score};
use crate::record::LogRecord;
use crate::restore::{Restorer, RestorerKind};
use crate::types::{
    AlertState, DegradationParameters, Dimensions, Frame, PipelineConfig, PipelineError,
    SensorReading,
};

/// Everything produced by one cycle.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    /// Parameters selected from the light level.
    pub parameters: DegradationParameters,
    /// Frame after brightness/contrast adjustment.
    pub adjusted: Frame,
    /// Adjusted frame with noise added.
    pub noisy: Frame,
    /// Noisy frame after restoration.
    pub restored: Frame,
    /// PSNR captured vs noisy (dB). Drives the alert.
    pub degradation_psnr: f64,
    /// PSNR captured vs restored (dB).
    pub restoration_psnr: f64,
    /// Visibility classification of `degradation_psnr`.
    pub alert: AlertState,
    /// What to show.
    pub display: DisplayData,
    /// What to log.
    pub log_record: LogRecord,
    /// Per-stage timing and metrics.
    pub diagnostics: CycleDiagnostics,
}

/// Runs the degrade/restore/assess pipeline once per trigger.
///
/// Holds no state between cycles besides its configuration and the
/// injected noise source, clock and restorer.
#[derive(Debug)]
pub struct CycleProcessor<N, C, R = RestorerKind> {
    config: PipelineConfig,
    noise: N,
    clock: C,
    restorer: R,
}

impl<N: GaussianSource, C: Clock> CycleProcessor<N, C> {
    /// Create a processor that restores with `config.restorer`, after
    /// validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration is
    /// out of range.
    pub fn new(config: PipelineConfig, noise: N, clock: C) -> Result<Self, PipelineError> {
        let restorer = config.restorer;
        Self::with_restorer(config, noise, clock, restorer)
    }
}

impl<N: GaussianSource, C: Clock, R: Restorer> CycleProcessor<N, C, R> {
    /// Create a processor with a caller-supplied restorer. `config.restorer`
    /// is still validated but not used.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration is
    /// out of range.
    pub fn with_restorer(
        config: PipelineConfig,
        noise: N,
        clock: C,
        restorer: R,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            noise,
            clock,
            restorer,
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one captured frame against one sensor reading.
    ///
    /// # Pipeline steps
    ///
    /// 1. Select brightness/contrast from the light level
    /// 2. Adjust brightness and contrast
    /// 3. Inject Gaussian noise
    /// 4. Restore
    /// 5. Score captured vs noisy (alert) and captured vs restored
    /// 6. Build the display model and the log record
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyFrame`] for a frame without pixels,
    /// [`PipelineError::InvalidLightLevel`] for a non-finite light level,
    /// and [`PipelineError::DimensionMismatch`] if the restorer changes
    /// the frame's shape.
    pub fn process_one_cycle(
        &mut self,
        reading: &SensorReading,
        frame: &Frame,
    ) -> Result<CycleOutput, PipelineError> {
        let dims = Dimensions::of(frame);
        if dims.is_empty() {
            return Err(PipelineError::EmptyFrame);
        }
        let cycle_start = self.clock.now();

        // 1-2. Parameters and brightness/contrast.
        let start = self.clock.now();
        let parameters = select_parameters(reading.light_level, self.config.noise_sigma)?;
        let adjusted = adjust_brightness_contrast(
            frame,
            parameters.brightness_factor,
            parameters.contrast_factor,
        );
        let adjust = StageDiagnostics {
            duration: self.clock.elapsed(&start),
            metrics: StageMetrics::Adjust {
                bucket: LightBucket::for_level(reading.light_level),
                brightness: parameters.brightness_factor,
                contrast: parameters.contrast_factor,
                mean_before: mean_channel(frame),
                mean_after: mean_channel(&adjusted),
            },
        };

        // 3. Noise.
        let start = self.clock.now();
        let noisy = add_gaussian_noise(&adjusted, parameters.noise_sigma, &mut self.noise);
        let noise = StageDiagnostics {
            duration: self.clock.elapsed(&start),
            metrics: StageMetrics::Noise {
                sigma: parameters.noise_sigma,
                clipped_fraction: clipped_fraction(&adjusted, &noisy),
            },
        };

        // 4. Restoration.
        let start = self.clock.now();
        let restored = self.restorer.restore(&noisy);
        let restored_dims = Dimensions::of(&restored);
        if restored_dims != dims {
            return Err(PipelineError::DimensionMismatch {
                left: dims,
                right: restored_dims,
            });
        }
        let restore = StageDiagnostics {
            duration: self.clock.elapsed(&start),
            metrics: StageMetrics::Restore {
                strategy: self.restorer.name().to_string(),
            },
        };

        // 5. Quality.
        let start = self.clock.now();
        let degradation_psnr = psnr(frame, &noisy)?;
        let restoration_psnr = psnr(frame, &restored)?;
        let alert = classify(degradation_psnr, self.config.alert_threshold);
        let assess = StageDiagnostics {
            duration: self.clock.elapsed(&start),
            metrics: StageMetrics::Assess {
                degradation_psnr,
                restoration_psnr,
                threshold: self.config.alert_threshold,
            },
        };

        log::debug!(
            "light={} bucket={:?} psnr noisy={degradation_psnr:.2}dB restored={restoration_psnr:.2}dB alert={alert:?}",
            reading.light_level,
            LightBucket::for_level(reading.light_level),
        );

        // 6. Outputs.
        let display = DisplayData::new(
            [frame, &noisy, &restored],
            reading,
            degradation_psnr,
            alert,
            self.config.preview_scale,
        );
        let log_record = LogRecord {
            sensor_values: reading.as_triple(),
            original_frame: frame.clone(),
            noisy_frame: noisy.clone(),
            restored_frame: restored.clone(),
            psnr: round_score(degradation_psnr),
            timestamp: self.clock.unix_seconds(),
        };
        let diagnostics = CycleDiagnostics {
            adjust,
            noise,
            restore,
            assess,
            total_duration: self.clock.elapsed(&cycle_start),
            frame_width: dims.width,
            frame_height: dims.height,
        };

        Ok(CycleOutput {
            parameters,
            adjusted,
            noisy,
            restored,
            degradation_psnr,
            restoration_psnr,
            alert,
            display,
            log_record,
            diagnostics,
        })
    }
}
