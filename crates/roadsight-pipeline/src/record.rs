//! Session log record: one JSON object per processed cycle.
//!
//! Frames are serialized as nested arrays, rows of pixels of `[r, g, b]`
//! triples, so a record can be loaded by any JSON reader without knowing
//! the frame dimensions up front.

use serde::{Deserialize, Serialize};

use crate::types::{Frame, SensorReading};

/// One line of the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Raw `(light, temperature, humidity)` triple.
    pub sensor_values: [f64; 3],
    /// Captured frame.
    #[serde(with = "frame_rows")]
    pub original_frame: Frame,
    /// Frame after brightness adjustment and noise.
    #[serde(with = "frame_rows")]
    pub noisy_frame: Frame,
    /// Frame after restoration.
    #[serde(with = "frame_rows")]
    pub restored_frame: Frame,
    /// PSNR original vs noisy, rounded to two decimals.
    pub psnr: f64,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl LogRecord {
    /// The sensor reading this record was produced from.
    #[must_use]
    pub const fn reading(&self) -> SensorReading {
        let [light, temperature, humidity] = self.sensor_values;
        SensorReading::new(light, temperature, humidity)
    }
}

/// Serde adapter: `Frame` <-> `Vec<Vec<[u8; 3]>>` (rows of pixels).
mod frame_rows {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeSeq};

    use crate::types::Frame;

    /// One row of pixels, borrowed from the frame.
    struct Row<'a>(&'a [u8]);

    impl Serialize for Row<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(self.0.len() / 3))?;
            for px in self.0.chunks_exact(3) {
                seq.serialize_element(&[px[0], px[1], px[2]])?;
            }
            seq.end()
        }
    }

    pub fn serialize<S: Serializer>(frame: &Frame, serializer: S) -> Result<S::Ok, S::Error> {
        let stride = frame.width() as usize * 3;
        let raw = frame.as_raw();
        let mut seq = serializer.serialize_seq(Some(frame.height() as usize))?;
        if stride > 0 {
            for row in raw.chunks_exact(stride) {
                seq.serialize_element(&Row(row))?;
            }
        } else {
            for _ in 0..frame.height() {
                seq.serialize_element(&Row(&[]))?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Frame, D::Error> {
        let rows = Vec::<Vec<[u8; 3]>>::deserialize(deserializer)?;
        let height = u32::try_from(rows.len())
            .map_err(|_| serde::de::Error::custom("frame has too many rows"))?;
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return Err(serde::de::Error::custom("frame rows have differing lengths"));
        }
        let width = u32::try_from(width)
            .map_err(|_| serde::de::Error::custom("frame rows are too long"))?;
        let raw: Vec<u8> = rows.into_iter().flatten().flatten().collect();
        Frame::from_raw(width, height, raw)
            .ok_or_else(|| serde::de::Error::custom("invalid frame dimensions"))
    }
}
