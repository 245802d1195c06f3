//! Sensor feeds.
//!
//! [`LineSensor`] reads the microcontroller's line protocol from any
//! [`BufRead`] (a serial port, a file, stdin). [`SimulatedSensor`] draws
//! plausible readings when no hardware is attached.

use std::io::BufRead;

use rand::Rng;
use roadsight_pipeline::SensorReading;
use roadsight_pipeline::sensor::{read_sensor_line, simulate_reading};

/// Something that can be polled for the latest reading.
pub trait SensorSource {
    /// Fetch one reading. `None` means no valid reading this cycle.
    fn poll(&mut self) -> Option<SensorReading>;

    /// Returns `true` once the source can never produce another reading.
    fn is_exhausted(&self) -> bool {
        false
    }
}

impl<T: SensorSource + ?Sized> SensorSource for Box<T> {
    fn poll(&mut self) -> Option<SensorReading> {
        (**self).poll()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

/// Reads one line per poll and parses it.
///
/// Lines that are not readings (or are malformed) yield `None` for that
/// poll; the next poll reads the next line.
#[derive(Debug)]
pub struct LineSensor<R> {
    reader: R,
    line: String,
    exhausted: bool,
}

impl<R: BufRead> LineSensor<R> {
    /// Wrap a line-oriented reader.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            exhausted: false,
        }
    }
}

impl<R: BufRead> SensorSource for LineSensor<R> {
    fn poll(&mut self) -> Option<SensorReading> {
        if self.exhausted {
            return None;
        }
        self.line.clear();
        match self.reader.read_line(&mut self.line) {
            Ok(0) => {
                log::info!("sensor feed reached end of input");
                self.exhausted = true;
                None
            }
            Ok(_) => read_sensor_line(&self.line),
            Err(e) => {
                log::warn!("error reading sensor feed: {e}");
                None
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Produces a fresh random reading on every poll.
#[derive(Debug, Clone)]
pub struct SimulatedSensor<R> {
    rng: R,
}

impl<R: Rng> SimulatedSensor<R> {
    /// Simulator driven by `rng`.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> SensorSource for SimulatedSensor<R> {
    fn poll(&mut self) -> Option<SensorReading> {
        let reading = simulate_reading(&mut self.rng);
        log::debug!("simulated reading {reading:?}");
        Some(reading)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn line_sensor_reads_one_line_per_poll() {
        let feed = "Light:30,Temperature:20,Humidity:50\nLight:400,Temperature:21,Humidity:55\n";
        let mut sensor = LineSensor::new(Cursor::new(feed));
        assert_eq!(sensor.poll(), Some(SensorReading::new(30.0, 20.0, 50.0)));
        assert_eq!(sensor.poll(), Some(SensorReading::new(400.0, 21.0, 55.0)));
        assert!(!sensor.is_exhausted());
        assert_eq!(sensor.poll(), None);
        assert!(sensor.is_exhausted());
    }

    #[test]
    fn line_sensor_recovers_after_bad_line() {
        let feed = "Light:oops,1,2\nready\nLight:5,6,7";
        let mut sensor = LineSensor::new(Cursor::new(feed));
        assert_eq!(sensor.poll(), None);
        assert_eq!(sensor.poll(), None);
        assert_eq!(sensor.poll(), Some(SensorReading::new(5.0, 6.0, 7.0)));
        assert!(!sensor.is_exhausted());
    }

    #[test]
    fn simulated_sensor_always_has_a_reading() {
        let mut sensor = SimulatedSensor::new(StdRng::seed_from_u64(1));
        for _ in 0..10 {
            let reading = sensor.poll().unwrap();
            assert!((0.0..=1000.0).contains(&reading.light_level));
        }
        assert!(!sensor.is_exhausted());
    }

    #[test]
    fn seeded_simulators_agree() {
        let mut a = SimulatedSensor::new(StdRng::seed_from_u64(42));
        let mut b = SimulatedSensor::new(StdRng::seed_from_u64(42));
        assert_eq!(a.poll(), b.poll());
    }
}
