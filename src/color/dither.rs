//! Temporal dithering of the bits below the 8 that reach the strips.

use super::Color;
use crate::error::ConfigError;

/// Per-frame dither of a pixel.
pub trait Dither: Sized {
    /// Builds the operator for colors of `bits_per_channel` depth.
    fn new(bits_per_channel: u32, max_dither_bits: u32) -> Result<Self, ConfigError>;

    fn apply(&self, color: Color) -> Color;

    /// Moves to the next offset of the pattern, once per rendered frame.
    fn advance_pattern(&mut self);
}

/// Leaves pixels untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDither;

impl Dither for NoDither {
    fn new(_bits_per_channel: u32, _max_dither_bits: u32) -> Result<Self, ConfigError> {
        Ok(Self)
    }

    #[inline]
    fn apply(&self, color: Color) -> Color {
        color
    }

    fn advance_pattern(&mut self) {}
}

/// Adds a butterfly sequence offset to each component every frame.
///
/// With `n` dither bits the offsets run through all `2^n` values in
/// bit-reversed order (`0, 4, 2, 6, 1, 5, 3, 7` for 3 bits), so consecutive
/// frames land far apart and flicker stays uncorrelated. The offsets are
/// aligned to the top of the bits that output packing discards.
///
/// No saturation is applied: the host keeps components at most
/// `0xff << (bpc - 8)` and interpolation preserves that bound, so the sum
/// stays within `bpc` bits.
#[derive(Debug, Clone, Copy)]
pub struct TemporalDither {
    /// Number of bits in the sequence
    bits: u32,
    /// Low bits left at zero below the sequence
    zeroes: u32,
    noise: u32,
}

impl TemporalDither {
    /// Offset added during the current frame.
    pub const fn noise(&self) -> u32 {
        self.noise
    }

    /// Number of frames before the pattern repeats.
    pub const fn period(&self) -> u32 {
        1 << self.bits
    }
}

impl Dither for TemporalDither {
    fn new(bits_per_channel: u32, max_dither_bits: u32) -> Result<Self, ConfigError> {
        if bits_per_channel <= 8 {
            return Err(ConfigError::UnsupportedDepth);
        }
        let spare = bits_per_channel - 8;
        let bits = spare.min(max_dither_bits);
        Ok(Self {
            bits,
            zeroes: spare - bits,
            noise: 0,
        })
    }

    #[inline]
    fn apply(&self, color: Color) -> Color {
        color.map(|c| c + self.noise)
    }

    fn advance_pattern(&mut self) {
        // Counting up in bit-reversed order. With zero bits the shifts are by
        // the full width and the pattern stays at zero.
        let shift = 32 - self.bits;
        let reversed = (self.noise >> self.zeroes).checked_shl(shift).unwrap_or(0).reverse_bits();
        let next = (reversed + 1).reverse_bits().checked_shr(shift).unwrap_or(0);
        self.noise = next << self.zeroes;
    }
}
