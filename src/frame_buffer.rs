//! Zero-copy frame buffers.
//!
//! A frame buffer holds the transport packets of one frame exactly as they
//! arrived and decodes pixels from them on demand.

use core::marker::PhantomData;

use embassy_time::Instant;
use heapless::Vec;

use crate::color::Color;
use crate::pool::{Packet, PacketPool};
use crate::protocol::{ColorFormat, PACKET_SIZE, pixels_per_packet};

/// Decodes pixels of one color format straight from packet bytes.
pub trait FrameFormat {
    const FORMAT: ColorFormat;
    const BITS_PER_CHANNEL: u32 = Self::FORMAT.bits_per_channel();
    const PIXELS_PER_PACKET: usize = pixels_per_packet(Self::FORMAT);

    /// Reads pixel `offset` of a frame packet.
    fn pixel(packet: &[u8; PACKET_SIZE], offset: usize) -> Color;
}

/// 24-bit packed RGB, three bytes per pixel after the header.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rgb24;

impl FrameFormat for Rgb24 {
    const FORMAT: ColorFormat = ColorFormat::R8G8B8;

    #[inline]
    fn pixel(packet: &[u8; PACKET_SIZE], offset: usize) -> Color {
        let start = 1 + offset * 3;
        let p = &packet[start..start + 3];
        Color::new(u32::from(p[0]), u32::from(p[1]), u32::from(p[2]))
    }
}

/// 33-bit RGB: 11 bits per channel in a 32-bit word, blue LSBs in a bitmap.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rgb33;

impl FrameFormat for Rgb33 {
    const FORMAT: ColorFormat = ColorFormat::R11G11B11;

    #[inline]
    fn pixel(packet: &[u8; PACKET_SIZE], offset: usize) -> Color {
        let start = 4 + offset * 4;
        let word = u32::from_le_bytes([
            packet[start],
            packet[start + 1],
            packet[start + 2],
            packet[start + 3],
        ]);
        let blues = u32::from(u16::from_le_bytes([packet[2], packet[3]]));
        Color::new(
            word >> 21,
            (word >> 10) & 0x7ff,
            ((word & 0x3ff) << 1) | ((blues >> offset) & 1),
        )
    }
}

/// Packets of one frame plus the time its last packet arrived.
pub struct FrameBuffer<'a, F: FrameFormat, const MAX_PACKETS: usize> {
    packets: Vec<Packet<'a>, MAX_PACKETS>,
    time: Instant,
    _format: PhantomData<F>,
}

impl<'a, F: FrameFormat, const MAX_PACKETS: usize> FrameBuffer<'a, F, MAX_PACKETS> {
    /// Creates a frame buffer holding `packets_per_frame` zeroed packets.
    pub fn new(pool: &'a PacketPool, packets_per_frame: usize) -> Self {
        let mut packets = Vec::new();
        for _ in 0..packets_per_frame.min(MAX_PACKETS) {
            if packets.push(pool.alloc_zeroed()).is_err() {
                break;
            }
        }
        Self {
            packets,
            time: Instant::from_ticks(0),
            _format: PhantomData,
        }
    }

    /// Number of packets held, one per packet of the frame.
    pub fn packets_per_frame(&self) -> usize {
        self.packets.len()
    }

    /// Time at which the last packet of the frame was stored.
    pub const fn time(&self) -> Instant {
        self.time
    }

    /// Stores a packet of the frame, taking ownership of it.
    ///
    /// Packets with an index outside the frame are dropped. Otherwise the
    /// packet replaces the one in its slot, which goes back to the pool.
    /// Bytes past `len` are zeroed; nothing else about the packet is checked.
    ///
    /// Returns `true` when this was the last packet of the frame. Arrival
    /// order does not matter: only the last index completes a frame, even if
    /// earlier packets never came.
    pub fn store_frame_packet(
        &mut self,
        packets_per_frame: usize,
        index: usize,
        mut packet: Packet<'a>,
        len: usize,
        now: Instant,
    ) -> bool {
        if index >= packets_per_frame || index >= self.packets.len() {
            return false;
        }

        packet.zero_pad(len);
        // the displaced packet is dropped here and returns to the pool
        self.packets[index] = packet;

        if index == packets_per_frame - 1 {
            self.time = now;
            return true;
        }
        false
    }

    /// Decodes pixel `offset` of packet `packet_index`.
    #[inline]
    pub fn pixel(&self, packet_index: usize, offset: usize) -> Color {
        self.packets
            .get(packet_index)
            .map_or(Color::default(), |packet| F::pixel(packet.bytes(), offset))
    }

    /// Decodes the pixel at position `index` in the frame.
    #[inline]
    pub fn pixel_at(&self, index: usize) -> Color {
        self.pixel(index / F::PIXELS_PER_PACKET, index % F::PIXELS_PER_PACKET)
    }
}
