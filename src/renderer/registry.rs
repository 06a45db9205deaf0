//! Table of compiled renderers and the holder of the active one.

use super::{DoubleBuffered, RendererOptions, RendererSlot, TripleBuffered};
use crate::error::ConfigError;
use crate::pool::PacketPool;
use crate::protocol::{ColorFormat, DitherMode, InterpolateMode};

use ColorFormat::{R8G8B8, R11G11B11};
use DitherMode::{None as NoDither, Temporal};
use InterpolateMode::{Linear, None as NoInterpolation};

/// Identifies a rendering algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererId {
    pub color_format: ColorFormat,
    pub dither_mode: DitherMode,
    pub interpolate_mode: InterpolateMode,
}

impl RendererId {
    pub const fn new(
        color_format: ColorFormat,
        dither_mode: DitherMode,
        interpolate_mode: InterpolateMode,
    ) -> Self {
        Self {
            color_format,
            dither_mode,
            interpolate_mode,
        }
    }

    /// Dither mode actually applied.
    ///
    /// 24-bit frames without interpolation have no bits below the output
    /// depth, so dithering them is a no-op and is compiled out.
    pub const fn effective_dither_mode(self) -> DitherMode {
        match (self.color_format, self.interpolate_mode) {
            (ColorFormat::R8G8B8, InterpolateMode::None) => DitherMode::None,
            _ => self.dither_mode,
        }
    }

    /// The identifier of the renderer that is built for this one.
    pub const fn effective(self) -> Self {
        Self::new(self.color_format, self.effective_dither_mode(), self.interpolate_mode)
    }

    /// Whether the renderer keeps a prior frame for interpolation.
    pub const fn is_triple_buffered(self) -> bool {
        !matches!(self.interpolate_mode, InterpolateMode::None)
    }
}

/// Builds a renderer into a slot.
pub type RendererFactory =
    for<'a> fn(&'a PacketPool, RendererOptions) -> Result<RendererSlot<'a>, ConfigError>;

/// One compiled renderer.
#[derive(Clone, Copy)]
pub struct RendererEntry {
    pub id: RendererId,
    pub make: RendererFactory,
}

impl RendererEntry {
    pub const fn new(
        color_format: ColorFormat,
        dither_mode: DitherMode,
        interpolate_mode: InterpolateMode,
        make: RendererFactory,
    ) -> Self {
        Self {
            id: RendererId::new(color_format, dither_mode, interpolate_mode),
            make,
        }
    }
}

impl core::fmt::Debug for RendererEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RendererEntry").field("id", &self.id).finish_non_exhaustive()
    }
}

fn make_rgb24(pool: &PacketPool, options: RendererOptions) -> Result<RendererSlot<'_>, ConfigError> {
    DoubleBuffered::new(pool, options).map(RendererSlot::Rgb24)
}

fn make_rgb33(pool: &PacketPool, options: RendererOptions) -> Result<RendererSlot<'_>, ConfigError> {
    DoubleBuffered::new(pool, options).map(RendererSlot::Rgb33)
}

fn make_rgb33_dithered(
    pool: &PacketPool,
    options: RendererOptions,
) -> Result<RendererSlot<'_>, ConfigError> {
    DoubleBuffered::new(pool, options).map(RendererSlot::Rgb33Dithered)
}

fn make_rgb24_linear(
    pool: &PacketPool,
    options: RendererOptions,
) -> Result<RendererSlot<'_>, ConfigError> {
    TripleBuffered::new(pool, options).map(RendererSlot::Rgb24Linear)
}

fn make_rgb24_linear_dithered(
    pool: &PacketPool,
    options: RendererOptions,
) -> Result<RendererSlot<'_>, ConfigError> {
    TripleBuffered::new(pool, options).map(RendererSlot::Rgb24LinearDithered)
}

fn make_rgb33_linear(
    pool: &PacketPool,
    options: RendererOptions,
) -> Result<RendererSlot<'_>, ConfigError> {
    TripleBuffered::new(pool, options).map(RendererSlot::Rgb33Linear)
}

fn make_rgb33_linear_dithered(
    pool: &PacketPool,
    options: RendererOptions,
) -> Result<RendererSlot<'_>, ConfigError> {
    TripleBuffered::new(pool, options).map(RendererSlot::Rgb33LinearDithered)
}

/// Renderers compiled into the firmware.
///
/// Firmware images short on flash can pass a subset of these entries to
/// [`RendererHolder::with_table`].
pub const COMPILED_RENDERERS: &[RendererEntry] = &[
    RendererEntry::new(R8G8B8, NoDither, NoInterpolation, make_rgb24),
    RendererEntry::new(R8G8B8, NoDither, Linear, make_rgb24_linear),
    RendererEntry::new(R8G8B8, Temporal, Linear, make_rgb24_linear_dithered),
    RendererEntry::new(R11G11B11, NoDither, NoInterpolation, make_rgb33),
    RendererEntry::new(R11G11B11, Temporal, NoInterpolation, make_rgb33_dithered),
    RendererEntry::new(R11G11B11, NoDither, Linear, make_rgb33_linear),
    RendererEntry::new(R11G11B11, Temporal, Linear, make_rgb33_linear_dithered),
];

/// Holds the renderer selected at runtime.
///
/// There is always a renderer: before the first successful [`init`] and
/// after a failed one it is [`RendererSlot::Null`], which drops all frames
/// and renders nothing.
///
/// [`init`]: RendererHolder::init
pub struct RendererHolder<'a> {
    pool: &'a PacketPool,
    table: &'static [RendererEntry],
    renderer: RendererSlot<'a>,
}

impl<'a> RendererHolder<'a> {
    /// Creates a holder for all compiled renderers.
    pub const fn new(pool: &'a PacketPool) -> Self {
        Self::with_table(pool, COMPILED_RENDERERS)
    }

    /// Creates a holder restricted to the given renderers.
    pub const fn with_table(pool: &'a PacketPool, table: &'static [RendererEntry]) -> Self {
        Self {
            pool,
            table,
            renderer: RendererSlot::Null,
        }
    }

    /// Gets the current renderer, possibly the null renderer.
    pub const fn get(&self) -> &RendererSlot<'a> {
        &self.renderer
    }

    pub const fn get_mut(&mut self) -> &mut RendererSlot<'a> {
        &mut self.renderer
    }

    /// Replaces the current renderer with the one identified by `id`.
    ///
    /// Fails if the renderer isn't compiled in or rejects the options; the
    /// holder then keeps the null renderer.
    pub fn init(&mut self, id: RendererId, options: RendererOptions) -> Result<(), ConfigError> {
        // The old renderer must give its packets back before the new one
        // takes its own.
        self.clear();

        let id = id.effective();
        let entry = self
            .table
            .iter()
            .find(|entry| entry.id == id)
            .ok_or(ConfigError::UnsupportedRenderer)?;
        self.renderer = (entry.make)(self.pool, options)?;
        Ok(())
    }

    /// Drops the current renderer in favor of the null renderer.
    pub fn clear(&mut self) {
        self.renderer = RendererSlot::Null;
    }
}
