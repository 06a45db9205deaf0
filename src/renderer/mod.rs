//! Renderers turn received frames into output buffers.
//!
//! All renderers are stored in a single enum to avoid heap allocations. The
//! set of variants is fixed at compile time; [`RendererHolder`] picks one at
//! runtime from the configuration.

mod buffered;
mod registry;

use embassy_time::Instant;

pub use buffered::{DoubleBuffered, TripleBuffered};
pub use registry::{
    COMPILED_RENDERERS, RendererEntry, RendererFactory, RendererHolder, RendererId,
};

use crate::color::{LinearInterpolation, NoDither, TemporalDither};
use crate::config::{MAX_LED_STRIPS, MAX_LEDS_PER_STRIP};
use crate::error::ConfigError;
use crate::frame_buffer::{Rgb24, Rgb33};
use crate::pool::Packet;
use crate::protocol::{ColorFormat, packets_per_frame};

/// Highest accepted number of dither bits.
pub const MAX_DITHER_BITS: u32 = 8;

/// Configuration options for a rendering algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererOptions {
    /// Number of LED strips, 1 to 8
    pub led_strips: usize,
    /// Number of LEDs per strip, 1 to `MAX_LEDS_PER_STRIP`
    pub leds_per_strip: usize,
    /// Maximum number of color bits to dither, 0 to 8
    ///
    /// Sets the period of the temporal dither: 3 bits repeat every 8
    /// frames. If the refresh rate is low a long cycle flickers, so fewer
    /// bits should be used (2 bits cycle at 60 Hz for 120 pixels at 800 kHz).
    pub max_dither_bits: u32,
}

impl RendererOptions {
    pub const fn new(led_strips: usize, leds_per_strip: usize, max_dither_bits: u32) -> Self {
        Self {
            led_strips,
            leds_per_strip,
            max_dither_bits,
        }
    }

    /// Checks the options against the hardware limits.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.led_strips == 0
            || self.led_strips > MAX_LED_STRIPS
            || self.leds_per_strip == 0
            || self.leds_per_strip > MAX_LEDS_PER_STRIP
            || self.max_dither_bits > MAX_DITHER_BITS
        {
            return Err(ConfigError::InvalidOptions);
        }
        Ok(())
    }

    /// Number of pixels in a frame.
    pub const fn pixel_count(&self) -> usize {
        self.led_strips * self.leds_per_strip
    }

    /// Packets needed for a frame, checked against the buffer budget.
    pub(crate) const fn frame_packets(
        &self,
        format: ColorFormat,
        max_packets: usize,
    ) -> Result<usize, ConfigError> {
        if let Err(err) = self.validate() {
            return Err(err);
        }
        let packets = packets_per_frame(self.led_strips, self.leds_per_strip, format);
        if packets > max_packets {
            return Err(ConfigError::FrameTooLarge);
        }
        Ok(packets)
    }
}

/// Operations shared by every renderer.
pub trait Renderer<'a> {
    /// Stores a packet of the next frame, taking ownership of it.
    ///
    /// May be called from interrupt context. Returns `true` when the frame is
    /// complete and ready to be shown.
    fn store_frame_packet(&mut self, index: usize, packet: Packet<'a>, len: usize, now: Instant) -> bool;

    /// Flips frame buffers. Must be called before rendering a new frame.
    fn advance_frame(&mut self);

    /// Renders the current frame into an output buffer for DMA.
    ///
    /// Returns `true` if a frame was written.
    fn render(&mut self, out: &mut [u8], now: Instant) -> bool;
}

/// Slot holding the active renderer.
pub enum RendererSlot<'a> {
    /// Drops every packet and renders nothing
    Null,
    /// 24-bit frames
    Rgb24(DoubleBuffered<'a, Rgb24, NoDither>),
    /// 33-bit frames
    Rgb33(DoubleBuffered<'a, Rgb33, NoDither>),
    /// 33-bit frames with temporal dither
    Rgb33Dithered(DoubleBuffered<'a, Rgb33, TemporalDither>),
    /// 24-bit frames blended between frames
    Rgb24Linear(TripleBuffered<'a, Rgb24, NoDither, LinearInterpolation>),
    /// 24-bit frames blended between frames with temporal dither
    Rgb24LinearDithered(TripleBuffered<'a, Rgb24, TemporalDither, LinearInterpolation>),
    /// 33-bit frames blended between frames
    Rgb33Linear(TripleBuffered<'a, Rgb33, NoDither, LinearInterpolation>),
    /// 33-bit frames blended between frames with temporal dither
    Rgb33LinearDithered(TripleBuffered<'a, Rgb33, TemporalDither, LinearInterpolation>),
}

impl Default for RendererSlot<'_> {
    fn default() -> Self {
        Self::Null
    }
}

impl<'a> RendererSlot<'a> {
    /// Returns `true` for the fallback renderer.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Options the active renderer was built with.
    pub const fn options(&self) -> Option<&RendererOptions> {
        match self {
            Self::Null => None,
            Self::Rgb24(r) => Some(r.options()),
            Self::Rgb33(r) => Some(r.options()),
            Self::Rgb33Dithered(r) => Some(r.options()),
            Self::Rgb24Linear(r) => Some(r.options()),
            Self::Rgb24LinearDithered(r) => Some(r.options()),
            Self::Rgb33Linear(r) => Some(r.options()),
            Self::Rgb33LinearDithered(r) => Some(r.options()),
        }
    }

    /// Number of frame buffers of the active renderer.
    pub const fn frame_buffers(&self) -> usize {
        match self {
            Self::Null => 0,
            Self::Rgb24(_) | Self::Rgb33(_) | Self::Rgb33Dithered(_) => 2,
            Self::Rgb24Linear(_)
            | Self::Rgb24LinearDithered(_)
            | Self::Rgb33Linear(_)
            | Self::Rgb33LinearDithered(_) => 3,
        }
    }
}

impl<'a> Renderer<'a> for RendererSlot<'a> {
    fn store_frame_packet(&mut self, index: usize, packet: Packet<'a>, len: usize, now: Instant) -> bool {
        match self {
            Self::Null => {
                drop(packet);
                false
            }
            Self::Rgb24(r) => r.store_frame_packet(index, packet, len, now),
            Self::Rgb33(r) => r.store_frame_packet(index, packet, len, now),
            Self::Rgb33Dithered(r) => r.store_frame_packet(index, packet, len, now),
            Self::Rgb24Linear(r) => r.store_frame_packet(index, packet, len, now),
            Self::Rgb24LinearDithered(r) => r.store_frame_packet(index, packet, len, now),
            Self::Rgb33Linear(r) => r.store_frame_packet(index, packet, len, now),
            Self::Rgb33LinearDithered(r) => r.store_frame_packet(index, packet, len, now),
        }
    }

    fn advance_frame(&mut self) {
        match self {
            Self::Null => {}
            Self::Rgb24(r) => r.advance_frame(),
            Self::Rgb33(r) => r.advance_frame(),
            Self::Rgb33Dithered(r) => r.advance_frame(),
            Self::Rgb24Linear(r) => r.advance_frame(),
            Self::Rgb24LinearDithered(r) => r.advance_frame(),
            Self::Rgb33Linear(r) => r.advance_frame(),
            Self::Rgb33LinearDithered(r) => r.advance_frame(),
        }
    }

    fn render(&mut self, out: &mut [u8], now: Instant) -> bool {
        match self {
            Self::Null => false,
            Self::Rgb24(r) => r.render(out, now),
            Self::Rgb33(r) => r.render(out, now),
            Self::Rgb33Dithered(r) => r.render(out, now),
            Self::Rgb24Linear(r) => r.render(out, now),
            Self::Rgb24LinearDithered(r) => r.render(out, now),
            Self::Rgb33Linear(r) => r.render(out, now),
            Self::Rgb33LinearDithered(r) => r.render(out, now),
        }
    }
}
