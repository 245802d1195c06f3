//! Frame restoration: recover a frame from its noisy version.
//!
//! This module defines the [`Restorer`] trait for pluggable denoising
//! filters and the [`RestorerKind`] enum for selecting one at runtime from
//! [`PipelineConfig`](crate::PipelineConfig).
//!
//! # Strategy pattern
//!
//! The cycle processor only relies on the contract: a frame in, a frame of
//! the same dimensions out. Any filter satisfying that can be swapped in
//! without touching the pipeline.
//!
//! The default is a colored non-local-means filter. Luma and chroma are
//! separated (BT.601 YCbCr) and filtered with independent strengths `h`
//! and `h_color`, each pixel being replaced by a weighted mean of the
//! pixels in its search window whose surrounding template patch looks
//! similar.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::types::{Frame, PipelineError};

/// Trait for restoration strategies.
pub trait Restorer {
    /// Denoise `frame`. The result must have the same dimensions.
    fn restore(&self, frame: &Frame) -> Frame;

    /// Short name for logs and diagnostics.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<T: Restorer + ?Sized> Restorer for Box<T> {
    fn restore(&self, frame: &Frame) -> Frame {
        (**self).restore(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Parameters for the non-local-means filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NlMeansParams {
    /// Filter strength for the luma plane. Higher removes more noise
    /// and more detail.
    pub h: f32,
    /// Filter strength for the two chroma planes.
    pub h_color: f32,
    /// Side of the square patch compared between pixels (odd).
    pub template_window: u32,
    /// Side of the square region searched for similar patches (odd).
    pub search_window: u32,
}

impl NlMeansParams {
    /// Default luma strength.
    pub const DEFAULT_H: f32 = 10.0;
    /// Default chroma strength.
    pub const DEFAULT_H_COLOR: f32 = 10.0;
    /// Default template window side.
    pub const DEFAULT_TEMPLATE_WINDOW: u32 = 7;
    /// Default search window side.
    pub const DEFAULT_SEARCH_WINDOW: u32 = 21;
    /// Largest accepted window side.
    pub const MAX_WINDOW: u32 = 51;

    fn validate(&self) -> Result<(), PipelineError> {
        for (name, strength) in [("h", self.h), ("h_color", self.h_color)] {
            if !strength.is_finite() || strength <= 0.0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "nl-means {name} must be finite and positive, got {strength}"
                )));
            }
        }
        for (name, side) in [
            ("template_window", self.template_window),
            ("search_window", self.search_window),
        ] {
            if side % 2 == 0 || side > Self::MAX_WINDOW {
                return Err(PipelineError::InvalidConfig(format!(
                    "nl-means {name} must be odd and at most {}, got {side}",
                    Self::MAX_WINDOW
                )));
            }
        }
        if self.search_window < self.template_window {
            return Err(PipelineError::InvalidConfig(format!(
                "nl-means search_window ({}) must not be smaller than template_window ({})",
                self.search_window, self.template_window
            )));
        }
        Ok(())
    }
}

impl Default for NlMeansParams {
    fn default() -> Self {
        Self {
            h: Self::DEFAULT_H,
            h_color: Self::DEFAULT_H_COLOR,
            template_window: Self::DEFAULT_TEMPLATE_WINDOW,
            search_window: Self::DEFAULT_SEARCH_WINDOW,
        }
    }
}

/// Selects which restoration filter to use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestorerKind {
    /// Colored non-local means (luma/chroma split).
    NlMeans(NlMeansParams),

    /// Per-channel Gaussian blur via `imageproc`. Non-positive sigma
    /// returns the frame unchanged.
    Gaussian {
        /// Blur kernel sigma.
        sigma: f32,
    },

    /// Per-channel median filter via `imageproc` over a
    /// `(2 * radius + 1)` square.
    Median {
        /// Half-width of the filter window.
        radius: u32,
    },

    /// No restoration: the noisy frame is passed through.
    Identity,
}

impl Default for RestorerKind {
    fn default() -> Self {
        Self::NlMeans(NlMeansParams::default())
    }
}

impl RestorerKind {
    /// Largest accepted Gaussian sigma.
    pub const MAX_GAUSSIAN_SIGMA: f32 = 50.0;
    /// Largest accepted median radius.
    pub const MAX_MEDIAN_RADIUS: u32 = 50;

    /// Short name for logs and diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NlMeans(_) => "nl-means",
            Self::Gaussian { .. } => "gaussian",
            Self::Median { .. } => "median",
            Self::Identity => "identity",
        }
    }

    /// Check the strategy's parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for unusable parameters.
    pub fn validate(&self) -> Result<(), PipelineError> {
        match self {
            Self::NlMeans(params) => params.validate(),
            Self::Gaussian { sigma } if !sigma.is_finite() || *sigma > Self::MAX_GAUSSIAN_SIGMA => {
                Err(PipelineError::InvalidConfig(format!(
                    "gaussian sigma must be finite and at most {}, got {sigma}",
                    Self::MAX_GAUSSIAN_SIGMA
                )))
            }
            Self::Median { radius } if *radius > Self::MAX_MEDIAN_RADIUS => {
                Err(PipelineError::InvalidConfig(format!(
                    "median radius must be at most {}, got {radius}",
                    Self::MAX_MEDIAN_RADIUS
                )))
            }
            Self::Gaussian { .. } | Self::Median { .. } | Self::Identity => Ok(()),
        }
    }
}

impl Restorer for RestorerKind {
    fn name(&self) -> &str {
        Self::name(self)
    }

    fn restore(&self, frame: &Frame) -> Frame {
        match *self {
            Self::NlMeans(params) => nl_means_colored(frame, &params),
            Self::Gaussian { sigma } => {
                if sigma <= 0.0 {
                    return frame.clone();
                }
                map_channels(frame, |plane| {
                    imageproc::filter::gaussian_blur_f32(plane, sigma)
                })
            }
            Self::Median { radius } => map_channels(frame, |plane| {
                imageproc::filter::median_filter(plane, radius, radius)
            }),
            Self::Identity => frame.clone(),
        }
    }
}

/// Split `frame` into three grayscale planes, filter each independently,
/// and reassemble.
fn map_channels<F>(frame: &Frame, filter: F) -> Frame
where
    F: Fn(&GrayImage) -> GrayImage,
{
    let (w, h) = frame.dimensions();
    let planes: [GrayImage; 3] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([frame.get_pixel(x, y).0[c]]))
    });
    let filtered: [GrayImage; 3] = std::array::from_fn(|c| filter(&planes[c]));
    Frame::from_fn(w, h, |x, y| {
        image::Rgb([
            filtered[0].get_pixel(x, y).0[0],
            filtered[1].get_pixel(x, y).0[0],
            filtered[2].get_pixel(x, y).0[0],
        ])
    })
}

// ---------------------------------------------------------------------------
// Non-local means
// ---------------------------------------------------------------------------

/// A single-channel `f32` plane in row-major order.
struct Plane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Plane {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Copy with `pad` pixels of edge replication on every side.
    fn padded(&self, pad: usize) -> Self {
        let width = self.width + 2 * pad;
        let height = self.height + 2 * pad;
        let mut out = Self::new(width, height);
        for y in 0..height {
            let sy = y.saturating_sub(pad).min(self.height - 1);
            for x in 0..width {
                let sx = x.saturating_sub(pad).min(self.width - 1);
                out.data[y * width + x] = self.data[sy * self.width + sx];
            }
        }
        out
    }
}

/// Colored non-local means over YCbCr planes.
fn nl_means_colored(frame: &Frame, params: &NlMeansParams) -> Frame {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return frame.clone();
    }

    let [luma, cb, cr] = to_ycbcr(frame);
    let luma = nl_means_plane(&luma, params, params.h);
    let cb = nl_means_plane(&cb, params, params.h_color);
    let cr = nl_means_plane(&cr, params, params.h_color);
    from_ycbcr(w, h, &[luma, cb, cr])
}

/// Non-local means on a single plane.
///
/// For every displacement `(dx, dy)` inside the search window, the squared
/// difference between the plane and its shifted copy is summed over each
/// template patch using an integral image, giving all patch distances for
/// that displacement in one pass over the plane.
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn nl_means_plane(plane: &Plane, params: &NlMeansParams, strength: f32) -> Plane {
    let tr = (params.template_window / 2) as usize;
    let sr = (params.search_window / 2) as usize;
    let pad = tr + sr;
    let padded = plane.padded(pad);
    let pw = padded.width;

    let (w, h) = (plane.width, plane.height);
    // Region over which differences are needed: the frame plus the
    // template radius on every side.
    let rw = w + 2 * tr;
    let rh = h + 2 * tr;
    let template_area = ((2 * tr + 1) * (2 * tr + 1)) as f64;
    let inv_h2 = 1.0 / f64::from(strength * strength);

    let mut weight_sum = vec![0.0f64; w * h];
    let mut value_sum = vec![0.0f64; w * h];
    let mut integral = vec![0.0f64; (rw + 1) * (rh + 1)];

    let sr_i = sr as isize;
    for dy in -sr_i..=sr_i {
        for dx in -sr_i..=sr_i {
            // Integral image of squared differences over the region.
            for ry in 0..rh {
                let py = ry + sr; // padded row of region row `ry`
                let qy = (py as isize + dy) as usize;
                let mut row_acc = 0.0f64;
                for rx in 0..rw {
                    let px = rx + sr;
                    let qx = (px as isize + dx) as usize;
                    let d = f64::from(padded.data[py * pw + px] - padded.data[qy * pw + qx]);
                    row_acc += d * d;
                    integral[(ry + 1) * (rw + 1) + rx + 1] =
                        integral[ry * (rw + 1) + rx + 1] + row_acc;
                }
            }

            for y in 0..h {
                for x in 0..w {
                    // Patch centred on frame pixel (x, y) spans region
                    // rows y..=y+2tr and columns x..=x+2tr.
                    let x0 = x;
                    let y0 = y;
                    let x1 = x + 2 * tr + 1;
                    let y1 = y + 2 * tr + 1;
                    let sum = integral[y1 * (rw + 1) + x1] - integral[y0 * (rw + 1) + x1]
                        - integral[y1 * (rw + 1) + x0]
                        + integral[y0 * (rw + 1) + x0];
                    let dist = (sum / template_area).max(0.0);
                    let weight = (-dist * inv_h2).exp();

                    let qy = (y + pad) as isize + dy;
                    let qx = (x + pad) as isize + dx;
                    let neighbour = padded.data[qy as usize * pw + qx as usize];
                    weight_sum[y * w + x] += weight;
                    value_sum[y * w + x] += weight * f64::from(neighbour);
                }
            }
        }
    }

    let mut out = Plane::new(w, h);
    for (i, v) in out.data.iter_mut().enumerate() {
        // The zero displacement always contributes weight 1.
        #[allow(clippy::cast_possible_truncation)]
        {
            *v = (value_sum[i] / weight_sum[i]) as f32;
        }
    }
    out
}

/// Split into full-range BT.601 Y, Cb, Cr planes.
fn to_ycbcr(frame: &Frame) -> [Plane; 3] {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let mut planes = [Plane::new(w, h), Plane::new(w, h), Plane::new(w, h)];
    for (i, pixel) in frame.pixels().enumerate() {
        let [r, g, b] = pixel.0.map(f32::from);
        planes[0].data[i] = 0.299 * r + 0.587 * g + 0.114 * b;
        planes[1].data[i] = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
        planes[2].data[i] = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    }
    planes
}

/// Reassemble RGB from Y, Cb, Cr planes, rounding to the nearest value.
fn from_ycbcr(width: u32, height: u32, planes: &[Plane; 3]) -> Frame {
    let mut frame = Frame::new(width, height);
    for (i, pixel) in frame.pixels_mut().enumerate() {
        let y = planes[0].data[i];
        let cb = planes[1].data[i] - 128.0;
        let cr = planes[2].data[i] - 128.0;
        pixel.0 = [
            round_u8(1.402f32.mul_add(cr, y)),
            round_u8(0.714_136f32.mul_add(-cr, 0.344_136f32.mul_add(-cb, y))),
            round_u8(1.772f32.mul_add(cb, y)),
        ];
    }
    frame
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
