//! Color pipeline operators.
//!
//! Each pixel goes through decode, [`Interpolate`], [`Dither`] and
//! [`output_grb`] in that order. Operators work on [`Color`] values whose
//! depth grows as they go: interpolation adds 8 fractional bits, dithering
//! keeps the depth and packing truncates back to 8 bits per channel.

mod dither;
mod interpolate;
mod output;

pub use dither::{Dither, NoDither, TemporalDither};
pub use interpolate::{FULL_WEIGHT, Interpolate, LinearInterpolation, NoInterpolation};
pub use output::output_grb;
use smart_leds::RGB8;

/// 8-bit color as sent to the strips.
pub type Rgb = RGB8;

/// A color with a variable number of bits per component.
///
/// The depth is carried by the operator types, not by the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u32,
    pub g: u32,
    pub b: u32,
}

impl Color {
    pub const fn new(r: u32, g: u32, b: u32) -> Self {
        Self { r, g, b }
    }

    /// Applies `f` to every component.
    #[inline]
    pub fn map(self, mut f: impl FnMut(u32) -> u32) -> Self {
        Self {
            r: f(self.r),
            g: f(self.g),
            b: f(self.b),
        }
    }
}
