//! Signal quality: PSNR between two frames and the visibility alert it
//! drives.

use crate::types::{AlertState, Dimensions, Frame, PipelineError};

/// Score reported for pixel-identical frames in place of infinity.
pub const PSNR_IDENTICAL: f64 = 100.0;

/// Peak channel value for 8-bit frames.
const MAX_PIXEL: f64 = 255.0;

/// Mean squared error over every corresponding channel value.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the frames differ in
/// shape, or [`PipelineError::EmptyFrame`] if they have no pixels.
pub fn mse(a: &Frame, b: &Frame) -> Result<f64, PipelineError> {
    let left = Dimensions::of(a);
    let right = Dimensions::of(b);
    if left != right {
        return Err(PipelineError::DimensionMismatch { left, right });
    }
    if left.is_empty() {
        return Err(PipelineError::EmptyFrame);
    }

    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let n = a.as_raw().len() as f64;
    Ok(sum / n)
}

/// Peak signal-to-noise ratio between `a` and `b` in decibels.
///
/// Returns [`PSNR_IDENTICAL`] when the frames are pixel-identical,
/// otherwise `20 * log10(255 / sqrt(mse))`. Symmetric in its arguments.
///
/// # Errors
///
/// Same as [`mse`]: mismatched shapes are an error, never truncated or
/// broadcast.
pub fn psnr(a: &Frame, b: &Frame) -> Result<f64, PipelineError> {
    let mse = mse(a, b)?;
    if mse == 0.0 {
        return Ok(PSNR_IDENTICAL);
    }
    Ok(20.0 * (MAX_PIXEL / mse.sqrt()).log10())
}

/// Classify a PSNR score: below `threshold` is poor visibility.
#[must_use]
pub fn classify(score: f64, threshold: f64) -> AlertState {
    if score < threshold {
        AlertState::PoorVisibility
    } else {
        AlertState::Clear
    }
}

/// Round to two decimal places, as scores are logged.
#[must_use]
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[allow(clippy::cast_possible_truncation)]
    fn pattern(seed: u32) -> Frame {
        Frame::from_fn(6, 5, |x, y| {
            let v = ((x * 37 + y * 11 + seed * 53) % 256) as u8;
            image::Rgb([v, v.wrapping_mul(3), 255 - v])
        })
    }

    #[test]
    fn identical_frames_score_sentinel() {
        let f = pattern(1);
        assert!((psnr(&f, &f).unwrap() - PSNR_IDENTICAL).abs() < f64::EPSILON);
    }

    #[test]
    fn psnr_is_symmetric() {
        let a = pattern(1);
        let b = pattern(2);
        assert_eq!(psnr(&a, &b).unwrap(), psnr(&b, &a).unwrap());
    }

    #[test]
    fn known_mse_gives_known_psnr() {
        // Every channel differs by 5: MSE = 25, PSNR = 20 log10(255 / 5).
        let a = Frame::from_pixel(4, 4, image::Rgb([100, 100, 100]));
        let b = Frame::from_pixel(4, 4, image::Rgb([105, 105, 105]));
        assert!((mse(&a, &b).unwrap() - 25.0).abs() < 1e-12);
        let expected = 20.0 * (255.0f64 / 5.0).log10();
        assert!((psnr(&a, &b).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn single_channel_difference_is_averaged_over_all_channels() {
        let a = Frame::from_pixel(1, 1, image::Rgb([0, 0, 0]));
        let b = Frame::from_pixel(1, 1, image::Rgb([30, 0, 0]));
        assert!((mse(&a, &b).unwrap() - 300.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let a = Frame::new(4, 4);
        let b = Frame::new(4, 3);
        assert_eq!(
            psnr(&a, &b),
            Err(PipelineError::DimensionMismatch {
                left: Dimensions {
                    width: 4,
                    height: 4
                },
                right: Dimensions {
                    width: 4,
                    height: 3
                },
            })
        );
    }

    #[test]
    fn empty_frames_are_rejected() {
        let a = Frame::new(0, 0);
        assert_eq!(psnr(&a, &a), Err(PipelineError::EmptyFrame));
    }

    #[test]
    fn classify_threshold_is_exclusive() {
        assert_eq!(classify(29.9, 30.0), AlertState::PoorVisibility);
        assert_eq!(classify(30.0, 30.0), AlertState::Clear);
        assert_eq!(classify(PSNR_IDENTICAL, 30.0), AlertState::Clear);
    }

    #[test]
    fn round_score_keeps_two_decimals() {
        assert!((round_score(28.126_4) - 28.13).abs() < 1e-9);
        assert!((round_score(100.0) - 100.0).abs() < f64::EPSILON);
    }
}
