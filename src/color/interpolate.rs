//! Blending between the front and prior frames.

use embassy_time::Instant;

use super::Color;

/// Interpolation between consecutive frames.
pub trait Interpolate: Default {
    /// Fractional bits added to each component.
    const EXTRA_BITS: u32;

    /// Recomputes the blend for the current time.
    ///
    /// Called once per rendered frame with the capture times of both frames.
    fn set_coeffs(&mut self, now: Instant, front_time: Instant, prior_time: Instant);

    /// Blends a pixel of the front frame with the same pixel of the prior frame.
    fn apply(&self, front: Color, prior: Color) -> Color;
}

/// Shows the front frame only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterpolation;

impl Interpolate for NoInterpolation {
    const EXTRA_BITS: u32 = 0;

    fn set_coeffs(&mut self, _now: Instant, _front_time: Instant, _prior_time: Instant) {}

    #[inline]
    fn apply(&self, front: Color, _prior: Color) -> Color {
        front
    }
}

/// Longest advance or period (in microseconds) that is interpolated, about
/// 16 seconds. Beyond that the front frame is shown as is.
const MAX_INTERPOLATION_US: u64 = 0x100_0000;

/// Full weight of a blend coefficient.
pub const FULL_WEIGHT: u32 = 256;

/// Linear blend from the prior frame towards the front frame.
///
/// Over one frame period the output moves from the prior frame to the front
/// frame; once a full period has elapsed it holds the front frame.
#[derive(Debug, Clone, Copy)]
pub struct LinearInterpolation {
    alpha: u32,
    beta: u32,
}

impl LinearInterpolation {
    /// Weight of the front frame, 0 to 256.
    pub const fn alpha(&self) -> u32 {
        self.alpha
    }

    /// Weight of the prior frame, `256 - alpha`.
    pub const fn beta(&self) -> u32 {
        self.beta
    }

    #[inline]
    const fn lerp(&self, front: u32, prior: u32) -> u32 {
        front * self.alpha + prior * self.beta
    }

    fn blend_factor(now: Instant, front_time: Instant, prior_time: Instant) -> Option<u32> {
        let period = front_time.checked_duration_since(prior_time)?.as_micros();
        let advance = now.checked_duration_since(front_time)?.as_micros();
        if advance >= MAX_INTERPOLATION_US || period > MAX_INTERPOLATION_US || advance >= period {
            return None;
        }
        // both values fit in 24 bits, so the product fits in 32
        #[allow(clippy::cast_possible_truncation)]
        let alpha = (advance as u32) * FULL_WEIGHT / (period as u32);
        Some(alpha)
    }
}

impl Default for LinearInterpolation {
    fn default() -> Self {
        Self {
            alpha: FULL_WEIGHT,
            beta: 0,
        }
    }
}

impl Interpolate for LinearInterpolation {
    const EXTRA_BITS: u32 = 8;

    fn set_coeffs(&mut self, now: Instant, front_time: Instant, prior_time: Instant) {
        self.alpha = Self::blend_factor(now, front_time, prior_time).unwrap_or(FULL_WEIGHT);
        self.beta = FULL_WEIGHT - self.alpha;
    }

    #[inline]
    fn apply(&self, front: Color, prior: Color) -> Color {
        Color {
            r: self.lerp(front.r, prior.r),
            g: self.lerp(front.g, prior.g),
            b: self.lerp(front.b, prior.b),
        }
    }
}
