//! Brightness and contrast adjustment.
//!
//! First stage of every cycle: the captured frame is rescaled with the
//! factors chosen from the current light reading (see [`crate::bucket`])
//! before any noise is injected.

use crate::types::Frame;

/// Mid-gray pivot for the contrast stretch.
const CONTRAST_PIVOT: f32 = 127.5;

/// Rescale every channel by `brightness`, then stretch contrast around
/// mid-gray by `contrast`.
///
/// Per channel, in `f32`:
///
/// ```text
/// v = clamp(v * brightness, 0, 255)
/// v = clamp((v - 127.5) * contrast + 127.5, 0, 255)
/// ```
///
/// and the result is truncated back to `u8`. Out-of-range factors are
/// never an error; every output channel is clamped into `[0, 255]`.
#[must_use = "returns the adjusted frame"]
pub fn adjust_brightness_contrast(frame: &Frame, brightness: f32, contrast: f32) -> Frame {
    let mut out = frame.clone();
    for channel in out.iter_mut() {
        *channel = adjust_channel(*channel, brightness, contrast);
    }
    out
}

/// Apply the brightness/contrast transform to a single channel value.
///
/// Evaluated unfused, with plain `f32` rounding.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn adjust_channel(value: u8, brightness: f32, contrast: f32) -> u8 {
    let scaled = clamp_channel(f32::from(value) * brightness);
    let stretched = clamp_channel((scaled - CONTRAST_PIVOT) * contrast + CONTRAST_PIVOT);
    to_u8(stretched)
}

/// Clamp to the 8-bit channel range. NaN maps to 0.
fn clamp_channel(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 255.0) }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f32) -> u8 {
    // `v` is already within [0, 255]; the cast truncates toward zero.
    v as u8
}
