//! roadsight-pipeline: Pure frame processing pipeline (sans-IO).
//!
//! Turns a captured frame and a sensor reading into a visibility verdict
//! through:
//! light bucket -> brightness/contrast -> Gaussian noise -> restoration ->
//! PSNR -> alert.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! frames and returns structured data. Cameras, serial feeds, log files
//! and preview images live in `roadsight-io`.

pub mod brightness;
pub mod bucket;
pub mod diagnostics;
pub mod display;
pub mod noise;
pub mod pipeline;
pub mod quality;
pub mod record;
pub mod restore;
pub mod sensor;
pub mod types;

pub use bucket::{LightBucket, select_parameters};
pub use diagnostics::{Clock, CycleDiagnostics, SystemClock};
pub use display::{DisplayData, SensorReadouts};
pub use noise::{GaussianSource, RandGaussian, ZeroGaussian};
pub use pipeline::{CycleOutput, CycleProcessor};
pub use quality::{classify, psnr};
pub use record::LogRecord;
pub use restore::{NlMeansParams, Restorer, RestorerKind};
pub use sensor::{SensorParseError, parse_sensor_line, read_sensor_line, simulate_reading};
pub use types::{
    AlertState, AlertStyle, DegradationParameters, Dimensions, Frame, PipelineConfig,
    PipelineError, SensorReading,
};
