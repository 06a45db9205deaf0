use super::Color;

#[inline]
fn extract8(value: u32, bits_per_channel: u32) -> u32 {
    (value >> (bits_per_channel - 8)).min(0xff)
}

/// Truncates a color of `bits_per_channel` depth to 8 bits per channel and
/// packs it in GRB order for the strips.
#[inline]
pub fn output_grb(color: Color, bits_per_channel: u32) -> u32 {
    debug_assert!(bits_per_channel >= 8);
    (extract8(color.g, bits_per_channel) << 16)
        | (extract8(color.r, bits_per_channel) << 8)
        | extract8(color.b, bits_per_channel)
}
