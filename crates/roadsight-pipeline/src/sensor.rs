//! Sensor line protocol and reading simulation.
//!
//! The microcontroller emits one reading per line:
//!
//! ```text
//! Light:<light>,Temperature:<celsius>,Humidity:<percent>
//! ```
//!
//! Only lines beginning with `Light:` carry a reading. The field labels
//! are stripped wherever they occur and the remainder is split on commas,
//! so `Light:412,21.5,60` is accepted as well. A line either yields a full
//! [`SensorReading`] or nothing.

use rand::Rng;

use crate::types::SensorReading;

/// Prefix every reading line starts with.
pub const READING_PREFIX: &str = "Light:";

/// Labels removed before the fields are split.
const FIELD_LABELS: [&str; 3] = ["Light:", "Temperature:", "Humidity:"];

/// Names of the three fields, in wire order.
const FIELD_NAMES: [&str; 3] = ["light", "temperature", "humidity"];

/// Why a sensor line could not be turned into a reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorParseError {
    /// The line does not start with `Light:`.
    #[error("line does not start with \"Light:\"")]
    MissingPrefix,

    /// The line did not contain exactly three comma-separated fields.
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),

    /// A field is not a finite number.
    #[error("{field} value {value:?} is not a finite number")]
    InvalidNumber {
        /// Which field failed.
        field: &'static str,
        /// The offending text.
        value: String,
    },
}

/// Parse one sensor line into a reading.
///
/// # Errors
///
/// Returns a [`SensorParseError`] describing the first problem found.
pub fn parse_sensor_line(line: &str) -> Result<SensorReading, SensorParseError> {
    let line = line.trim();
    if !line.starts_with(READING_PREFIX) {
        return Err(SensorParseError::MissingPrefix);
    }

    let stripped = FIELD_LABELS
        .iter()
        .fold(line.to_owned(), |acc, label| acc.replace(label, ""));

    let fields: Vec<&str> = stripped.split(',').collect();
    if fields.len() != 3 {
        return Err(SensorParseError::FieldCount(fields.len()));
    }

    let mut values = [0.0f64; 3];
    for ((slot, text), field) in values.iter_mut().zip(&fields).zip(FIELD_NAMES) {
        *slot = text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| SensorParseError::InvalidNumber {
                field,
                value: (*text).to_owned(),
            })?;
    }

    let [light, temperature, humidity] = values;
    Ok(SensorReading::new(light, temperature, humidity))
}

/// Parse a sensor line, discarding it on failure.
///
/// Lines without the reading prefix are ignored silently (the feed also
/// carries boot banners and other chatter). Malformed reading lines are
/// reported at warn level. Either way no reading is produced for this
/// cycle.
#[must_use]
pub fn read_sensor_line(line: &str) -> Option<SensorReading> {
    log::debug!("raw sensor data: {}", line.trim_end());
    match parse_sensor_line(line) {
        Ok(reading) => Some(reading),
        Err(SensorParseError::MissingPrefix) => None,
        Err(e) => {
            log::warn!("discarding malformed sensor line {:?}: {e}", line.trim_end());
            None
        }
    }
}

/// Range of simulated temperatures, degrees Celsius.
pub const SIMULATED_TEMPERATURE: std::ops::Range<f64> = 15.0..30.0;

/// Range of simulated humidity, percent.
pub const SIMULATED_HUMIDITY: std::ops::Range<f64> = 40.0..90.0;

/// Largest simulated light level, lux (inclusive).
pub const SIMULATED_LIGHT_MAX: u32 = 1000;

/// Draw a plausible reading without hardware: uniform temperature and
/// humidity, integer light level in `0..=1000`.
pub fn simulate_reading<R: Rng>(rng: &mut R) -> SensorReading {
    let temperature = rng.random_range(SIMULATED_TEMPERATURE);
    let humidity = rng.random_range(SIMULATED_HUMIDITY);
    let light = rng.random_range(0..=SIMULATED_LIGHT_MAX);
    SensorReading::new(f64::from(light), temperature, humidity)
}
