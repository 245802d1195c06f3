//! Frame sources.
//!
//! A [`FrameSource`] stands in for the camera: each call to
//! [`capture`](FrameSource::capture) yields one RGB frame or an error.
//! Failures are not retried; the caller skips the cycle.

use std::path::PathBuf;

use roadsight_pipeline::Frame;

use crate::error::IoError;

/// Something that produces one frame per capture.
pub trait FrameSource {
    /// Capture the next frame.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError`] if no frame is available.
    fn capture(&mut self) -> Result<Frame, IoError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn capture(&mut self) -> Result<Frame, IoError> {
        (**self).capture()
    }
}

/// Replays image files, cycling back to the first after the last.
///
/// Every file is decoded on each capture and converted to 8-bit RGB.
#[derive(Debug, Clone)]
pub struct ImageFileSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageFileSource {
    /// Source over the given files, in order.
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths, next: 0 }
    }
}

impl FrameSource for ImageFileSource {
    fn capture(&mut self) -> Result<Frame, IoError> {
        let Some(path) = self.paths.get(self.next) else {
            return Err(IoError::Capture("no image files configured".to_string()));
        };
        self.next = (self.next + 1) % self.paths.len();

        let frame = image::open(path)
            .map_err(|source| IoError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        if frame.width() == 0 || frame.height() == 0 {
            return Err(IoError::Capture(format!(
                "{} decoded to an empty frame",
                path.display()
            )));
        }
        log::debug!(
            "captured {}x{} frame from {}",
            frame.width(),
            frame.height(),
            path.display()
        );
        Ok(frame)
    }
}

/// Deterministic test pattern: a diagonal gradient in red and green with
/// a constant blue channel.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
}

impl SyntheticSource {
    /// Default pattern width.
    pub const DEFAULT_WIDTH: u32 = 640;
    /// Default pattern height.
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// Pattern of the given size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
    }
}

impl FrameSource for SyntheticSource {
    fn capture(&mut self) -> Result<Frame, IoError> {
        if self.width == 0 || self.height == 0 {
            return Err(IoError::Capture(format!(
                "synthetic frame size {}x{} has no pixels",
                self.width, self.height
            )));
        }
        let (w, h) = (u64::from(self.width), u64::from(self.height));
        Ok(Frame::from_fn(self.width, self.height, |x, y| {
            let r = ramp(u64::from(x), w);
            let g = ramp(u64::from(y), h);
            image::Rgb([r, g, 96])
        }))
    }
}

/// Map `pos` in `0..len` linearly onto `0..=255`.
fn ramp(pos: u64, len: u64) -> u8 {
    let span = len.saturating_sub(1).max(1);
    u8::try_from(pos * 255 / span).unwrap_or(u8::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_frame_has_requested_size() {
        let frame = SyntheticSource::new(64, 48).capture().unwrap();
        assert_eq!(frame.dimensions(), (64, 48));
        assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 96]);
        assert_eq!(frame.get_pixel(63, 47).0, [255, 255, 96]);
    }

    #[test]
    fn synthetic_frames_repeat() {
        let mut source = SyntheticSource::default();
        assert_eq!(source.capture().unwrap(), source.capture().unwrap());
    }

    #[test]
    fn single_pixel_synthetic_frame() {
        let frame = SyntheticSource::new(1, 1).capture().unwrap();
        assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 96]);
    }

    #[test]
    fn empty_synthetic_frame_is_a_capture_failure() {
        let err = SyntheticSource::new(0, 10).capture().unwrap_err();
        assert!(matches!(err, IoError::Capture(_)));
    }

    #[test]
    fn no_paths_is_a_capture_failure() {
        let err = ImageFileSource::new(Vec::new()).capture().unwrap_err();
        assert!(matches!(err, IoError::Capture(_)));
    }

    #[test]
    fn missing_file_is_a_decode_failure() {
        let mut source = ImageFileSource::new(vec![PathBuf::from("/nonexistent/frame.png")]);
        let err = source.capture().unwrap_err();
        assert!(matches!(err, IoError::Decode { .. }), "{err}");
    }
}
