//! Bit-plane layout of the DMA output buffer.
//!
//! The output port drives 8 strips in parallel, so each byte written to the
//! port carries one bit for every strip. A pixel occupies 24 consecutive
//! bytes: byte `k` holds bit `23 - k` of each strip's GRB word, with strip `s`
//! in bit `s`. Colors are therefore sent MSB first in G, R, B order.

use crate::color::Rgb;
use crate::config::MAX_LED_STRIPS;

/// Bits sent per pixel.
pub const BITS_PER_PIXEL: usize = 24;

/// Size of the buffer needed for 8 strips of the given length.
pub const fn buffer_size(leds_per_strip: usize) -> usize {
    leds_per_strip * BITS_PER_PIXEL
}

/// Packs an 8-bit color as a GRB word.
pub const fn grb_word(color: Rgb) -> u32 {
    ((color.g as u32) << 16) | ((color.r as u32) << 8) | color.b as u32
}

/// Unpacks a GRB word.
#[allow(clippy::cast_possible_truncation)]
pub const fn rgb_from_grb(word: u32) -> Rgb {
    Rgb {
        r: (word >> 8) as u8,
        g: (word >> 16) as u8,
        b: word as u8,
    }
}

/// Swizzles one GRB word per strip into the 24 bytes of a pixel slot.
///
/// Strips beyond `words.len()` are sent as zeros.
pub fn push_pixels(out: &mut [u8], words: &[u32]) {
    debug_assert!(words.len() <= MAX_LED_STRIPS);
    for (k, byte) in out[..BITS_PER_PIXEL].iter_mut().enumerate() {
        let bit = BITS_PER_PIXEL - 1 - k;
        *byte = words
            .iter()
            .enumerate()
            .fold(0, |acc, (strip, word)| acc | ((((word >> bit) & 1) as u8) << strip));
    }
}

/// Fills an output buffer by sampling a GRB word for every strip and pixel.
///
/// `sample(strip, pixel)` is called strip-major within each pixel slot.
pub fn update_buffer<F>(out: &mut [u8], led_strips: usize, leds_per_strip: usize, mut sample: F)
where
    F: FnMut(usize, usize) -> u32,
{
    let strips = led_strips.min(MAX_LED_STRIPS);
    let mut words = [0u32; MAX_LED_STRIPS];
    for (pixel, chunk) in out
        .chunks_exact_mut(BITS_PER_PIXEL)
        .take(leds_per_strip)
        .enumerate()
    {
        for (strip, word) in words[..strips].iter_mut().enumerate() {
            *word = sample(strip, pixel);
        }
        push_pixels(chunk, &words[..strips]);
    }
}

/// Reads back the GRB word of one strip at one pixel.
pub fn unpack_word(buffer: &[u8], strip: usize, pixel: usize) -> u32 {
    let start = pixel * BITS_PER_PIXEL;
    buffer[start..start + BITS_PER_PIXEL]
        .iter()
        .fold(0, |acc, byte| (acc << 1) | u32::from((byte >> strip) & 1))
}

/// Reads back the color of one strip at one pixel.
pub fn unpack_pixel(buffer: &[u8], strip: usize, pixel: usize) -> Rgb {
    rgb_from_grb(unpack_word(buffer, strip, pixel))
}
