//! Double- and triple-buffered renderers.
//!
//! Each variant is specialized on the frame format and the color operators
//! so the per-pixel loop has no branches on the configuration.

use embassy_time::Instant;

use super::{Renderer, RendererOptions};
use crate::bitplane::update_buffer;
use crate::color::{Dither, Interpolate, output_grb};
use crate::config::{MAX_PACKETS_PER_DOUBLE_BUFFERED_FRAME, MAX_PACKETS_PER_TRIPLE_BUFFERED_FRAME};
use crate::error::ConfigError;
use crate::frame_buffer::{FrameBuffer, FrameFormat};
use crate::pool::{Packet, PacketPool};

type DoubleFrame<'a, F> = FrameBuffer<'a, F, MAX_PACKETS_PER_DOUBLE_BUFFERED_FRAME>;
type TripleFrame<'a, F> = FrameBuffer<'a, F, MAX_PACKETS_PER_TRIPLE_BUFFERED_FRAME>;

/// Renders the front frame as is while the back frame is being received.
pub struct DoubleBuffered<'a, F: FrameFormat, D: Dither> {
    options: RendererOptions,
    packets_per_frame: usize,
    buffers: [DoubleFrame<'a, F>; 2],
    back: usize,
    front: usize,
    dither: D,
}

impl<'a, F: FrameFormat, D: Dither> DoubleBuffered<'a, F, D> {
    const BITS_PER_CHANNEL: u32 = F::BITS_PER_CHANNEL;

    /// Builds the renderer, or rejects options it cannot handle.
    ///
    /// Nothing is taken from the pool unless the options are accepted.
    pub fn new(pool: &'a PacketPool, options: RendererOptions) -> Result<Self, ConfigError> {
        let packets_per_frame =
            options.frame_packets(F::FORMAT, MAX_PACKETS_PER_DOUBLE_BUFFERED_FRAME)?;
        let dither = D::new(Self::BITS_PER_CHANNEL, options.max_dither_bits)?;

        Ok(Self {
            options,
            packets_per_frame,
            buffers: [
                FrameBuffer::new(pool, packets_per_frame),
                FrameBuffer::new(pool, packets_per_frame),
            ],
            back: 0,
            front: 1,
            dither,
        })
    }

    pub const fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub const fn packets_per_frame(&self) -> usize {
        self.packets_per_frame
    }
}

impl<'a, F: FrameFormat, D: Dither> Renderer<'a> for DoubleBuffered<'a, F, D> {
    fn store_frame_packet(&mut self, index: usize, packet: Packet<'a>, len: usize, now: Instant) -> bool {
        self.buffers[self.back].store_frame_packet(self.packets_per_frame, index, packet, len, now)
    }

    fn advance_frame(&mut self) {
        core::mem::swap(&mut self.front, &mut self.back);
    }

    fn render(&mut self, out: &mut [u8], _now: Instant) -> bool {
        let leds_per_strip = self.options.leds_per_strip;
        let front = &self.buffers[self.front];
        let dither = &self.dither;

        update_buffer(out, self.options.led_strips, leds_per_strip, |strip, pixel| {
            let color = front.pixel_at(strip * leds_per_strip + pixel);
            output_grb(dither.apply(color), Self::BITS_PER_CHANNEL)
        });
        self.dither.advance_pattern();
        true
    }
}

/// Blends the front frame with the prior one while the back frame is being
/// received.
pub struct TripleBuffered<'a, F: FrameFormat, D: Dither, I: Interpolate> {
    options: RendererOptions,
    packets_per_frame: usize,
    buffers: [TripleFrame<'a, F>; 3],
    back: usize,
    front: usize,
    prior: usize,
    interpolate: I,
    dither: D,
}

impl<'a, F: FrameFormat, D: Dither, I: Interpolate> TripleBuffered<'a, F, D, I> {
    /// Depth after interpolation, which is what dithering and packing see.
    const BITS_PER_CHANNEL: u32 = F::BITS_PER_CHANNEL + I::EXTRA_BITS;

    /// Builds the renderer, or rejects options it cannot handle.
    ///
    /// Nothing is taken from the pool unless the options are accepted.
    pub fn new(pool: &'a PacketPool, options: RendererOptions) -> Result<Self, ConfigError> {
        let packets_per_frame =
            options.frame_packets(F::FORMAT, MAX_PACKETS_PER_TRIPLE_BUFFERED_FRAME)?;
        let dither = D::new(Self::BITS_PER_CHANNEL, options.max_dither_bits)?;

        Ok(Self {
            options,
            packets_per_frame,
            buffers: [
                FrameBuffer::new(pool, packets_per_frame),
                FrameBuffer::new(pool, packets_per_frame),
                FrameBuffer::new(pool, packets_per_frame),
            ],
            back: 0,
            front: 1,
            prior: 2,
            interpolate: I::default(),
            dither,
        })
    }

    pub const fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub const fn packets_per_frame(&self) -> usize {
        self.packets_per_frame
    }

    /// Interpolation state as of the last render.
    pub const fn interpolation(&self) -> &I {
        &self.interpolate
    }
}

impl<'a, F: FrameFormat, D: Dither, I: Interpolate> Renderer<'a> for TripleBuffered<'a, F, D, I> {
    fn store_frame_packet(&mut self, index: usize, packet: Packet<'a>, len: usize, now: Instant) -> bool {
        self.buffers[self.back].store_frame_packet(self.packets_per_frame, index, packet, len, now)
    }

    /// The received frame moves to the front, the old front becomes the
    /// prior frame and the old prior frame is reused for reception.
    fn advance_frame(&mut self) {
        core::mem::swap(&mut self.front, &mut self.prior);
        core::mem::swap(&mut self.front, &mut self.back);
    }

    fn render(&mut self, out: &mut [u8], now: Instant) -> bool {
        let front = &self.buffers[self.front];
        let prior = &self.buffers[self.prior];
        self.interpolate.set_coeffs(now, front.time(), prior.time());

        let leds_per_strip = self.options.leds_per_strip;
        let interpolate = &self.interpolate;
        let dither = &self.dither;

        update_buffer(out, self.options.led_strips, leds_per_strip, |strip, pixel| {
            let index = strip * leds_per_strip + pixel;
            let color = interpolate.apply(front.pixel_at(index), prior.pixel_at(index));
            output_grb(dither.apply(color), Self::BITS_PER_CHANNEL)
        });
        self.dither.advance_pattern();
        true
    }
}
