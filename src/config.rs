//! Compile-time memory limits.
//!
//! Every buffer in the pipeline is statically sized from these values.
//! Adjust them together: the packet pool must be able to hold every frame
//! buffer slot of the largest renderer plus the packets in flight.

/// Number of frame buffers the largest renderer allocates.
///
/// - `2`: frames are double-buffered, no interpolation
/// - `3`: frames are triple-buffered, interpolation is available
pub const MAX_FRAME_BUFFERS: usize = 3;

/// Maximum packets per frame when frames are double-buffered (4608 bytes).
pub const MAX_PACKETS_PER_DOUBLE_BUFFERED_FRAME: usize = 72;

/// Maximum packets per frame when frames are triple-buffered (3072 bytes).
pub const MAX_PACKETS_PER_TRIPLE_BUFFERED_FRAME: usize = 48;

/// Maximum number of LEDs on each strip.
///
/// Determines the DMA memory: each unit of length costs 48 bytes because
/// there are two output buffers.
pub const MAX_LEDS_PER_STRIP: usize = 120;

/// Maximum number of parallel strips driven by the output port.
pub const MAX_LED_STRIPS: usize = 8;

/// Packets held by frame buffers of any renderer variant.
pub const MAX_PACKETS_FOR_FRAME_BUFFERS: usize = max(
    2 * MAX_PACKETS_PER_DOUBLE_BUFFERED_FRAME,
    MAX_FRAME_BUFFERS * MAX_PACKETS_PER_TRIPLE_BUFFERED_FRAME,
);

/// Packets in the transport pool: every frame buffer slot plus 4 more to
/// keep the receive pipe full.
pub const NUM_PACKET_BUFFERS: usize = MAX_PACKETS_FOR_FRAME_BUFFERS + 4;

/// Bytes in one output buffer.
pub const OUTPUT_BUFFER_SIZE: usize = crate::bitplane::buffer_size(MAX_LEDS_PER_STRIP);

/// Interval between statistics reports when enabled by a debug packet.
pub const STATS_INTERVAL_MS: u64 = 1000;

const fn max(a: usize, b: usize) -> usize {
    if a > b { a } else { b }
}

// Output buffers and the packet pool share 16 KiB of RAM on the reference board.
const _: () = assert!(
    2 * OUTPUT_BUFFER_SIZE + NUM_PACKET_BUFFERS * crate::protocol::PACKET_SIZE < 16384,
    "buffers won't fit, adjust the limits in config.rs"
);
const _: () = assert!(MAX_FRAME_BUFFERS >= 2 && MAX_FRAME_BUFFERS <= 3);
const _: () = assert!(MAX_PACKETS_PER_DOUBLE_BUFFERED_FRAME <= crate::protocol::MAX_PACKETS_PER_FRAME);
const _: () = assert!(MAX_PACKETS_PER_TRIPLE_BUFFERED_FRAME <= crate::protocol::MAX_PACKETS_PER_FRAME);
