//! Gaussian noise injection.
//!
//! Simulates sensor and environmental degradation by adding independent
//! zero-mean Gaussian noise to every channel of a frame. The random source
//! is a [`GaussianSource`] supplied by the caller, so tests can substitute
//! a deterministic stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

use crate::types::Frame;

/// A stream of standard normal samples (mean 0, standard deviation 1).
pub trait GaussianSource {
    /// Draw the next sample.
    fn next_gaussian(&mut self) -> f64;
}

impl<T: GaussianSource + ?Sized> GaussianSource for &mut T {
    fn next_gaussian(&mut self) -> f64 {
        (**self).next_gaussian()
    }
}

/// [`GaussianSource`] backed by any [`rand::Rng`].
#[derive(Debug, Clone)]
pub struct RandGaussian<R> {
    rng: R,
}

impl<R: Rng> RandGaussian<R> {
    /// Wrap an existing generator.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandGaussian<StdRng> {
    /// Generator seeded from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Reproducible generator for a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> GaussianSource for RandGaussian<R> {
    fn next_gaussian(&mut self) -> f64 {
        StandardNormal.sample(&mut self.rng)
    }
}

/// A source that always yields `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroGaussian;

impl GaussianSource for ZeroGaussian {
    fn next_gaussian(&mut self) -> f64 {
        0.0
    }
}

/// Add zero-mean Gaussian noise with standard deviation `sigma` to every
/// channel of `frame`.
///
/// Each channel gets an independent sample `g`; the output is
/// `clamp(v + sigma * g, 0, 255)` truncated to `u8`. A `sigma` of zero
/// (or below) returns an exact copy without consuming any samples.
#[must_use = "returns the noisy frame"]
pub fn add_gaussian_noise<G: GaussianSource + ?Sized>(
    frame: &Frame,
    sigma: f64,
    source: &mut G,
) -> Frame {
    let mut out = frame.clone();
    if sigma <= 0.0 || sigma.is_nan() {
        return out;
    }

    for channel in out.iter_mut() {
        let noisy = sigma.mul_add(source.next_gaussian(), f64::from(*channel));
        *channel = to_u8(noisy);
    }
    out
}

/// Clamp to `[0, 255]` and truncate. NaN maps to 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f64) -> u8 {
    if v.is_nan() {
        0
    } else {
        v.clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed sequence of samples, cycling when exhausted.
    struct Scripted {
        samples: Vec<f64>,
        next: usize,
    }

    impl GaussianSource for Scripted {
        fn next_gaussian(&mut self) -> f64 {
            let v = self.samples[self.next % self.samples.len()];
            self.next += 1;
            v
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn gradient_frame() -> Frame {
        Frame::from_fn(8, 8, |x, y| image::Rgb([(x * 30) as u8, (y * 30) as u8, 128]))
    }

    #[test]
    fn zero_sigma_is_identity() {
        let frame = gradient_frame();
        let mut source = RandGaussian::seeded(7);
        assert_eq!(add_gaussian_noise(&frame, 0.0, &mut source), frame);
    }

    #[test]
    fn zero_source_is_identity_for_any_sigma() {
        let frame = gradient_frame();
        assert_eq!(add_gaussian_noise(&frame, 50.0, &mut ZeroGaussian), frame);
    }

    #[test]
    fn scripted_samples_are_scaled_by_sigma() {
        let frame = Frame::from_pixel(1, 1, image::Rgb([100, 100, 100]));
        let mut source = Scripted {
            samples: vec![1.0, -1.0, 0.5],
            next: 0,
        };
        let out = add_gaussian_noise(&frame, 10.0, &mut source);
        assert_eq!(out.get_pixel(0, 0).0, [110, 90, 105]);
        assert_eq!(source.next, 3, "one sample per channel");
    }

    #[test]
    fn sums_outside_range_are_clamped() {
        let frame = Frame::from_pixel(1, 1, image::Rgb([250, 5, 128]));
        let mut source = Scripted {
            samples: vec![3.0, -3.0, 0.0],
            next: 0,
        };
        let out = add_gaussian_noise(&frame, 25.0, &mut source);
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 128]);
    }

    #[test]
    fn fractional_results_truncate() {
        let frame = Frame::from_pixel(1, 1, image::Rgb([100, 100, 100]));
        let mut source = Scripted {
            samples: vec![0.09, -0.01, 0.0],
            next: 0,
        };
        // 100.9 -> 100, 99.9 -> 99
        let out = add_gaussian_noise(&frame, 10.0, &mut source);
        assert_eq!(out.get_pixel(0, 0).0, [100, 99, 100]);
    }

    #[test]
    fn seeded_sources_are_reproducible() {
        let frame = gradient_frame();
        let a = add_gaussian_noise(&frame, 25.0, &mut RandGaussian::seeded(42));
        let b = add_gaussian_noise(&frame, 25.0, &mut RandGaussian::seeded(42));
        assert_eq!(a, b);
        assert_ne!(a, frame);
    }

    #[test]
    fn sample_statistics_are_roughly_standard_normal() {
        let mut source = RandGaussian::seeded(3);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| source.next_gaussian()).collect();
        #[allow(clippy::cast_precision_loss)]
        let mean = samples.iter().sum::<f64>() / n as f64;
        #[allow(clippy::cast_precision_loss)]
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance {var}");
    }
}
