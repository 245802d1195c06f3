//! roadsight-io: Frame sources, sensor feeds and session output.
//!
//! Everything the pure pipeline in `roadsight-pipeline` leaves out: where
//! frames and readings come from (image files, a synthetic pattern, a
//! line-oriented sensor feed, a simulator) and where results go (the
//! JSON-lines session log and PNG previews).

pub mod camera;
pub mod error;
pub mod preview;
pub mod sensor;
pub mod session;

pub use camera::{FrameSource, ImageFileSource, SyntheticSource};
pub use error::IoError;
pub use preview::PreviewWriter;
pub use sensor::{LineSensor, SensorSource, SimulatedSensor};
pub use session::SessionLog;
