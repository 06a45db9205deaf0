#![no_std]

pub mod bitplane;
pub mod color;
pub mod config;
pub mod debug;
pub mod device;
pub mod driver;
pub mod error;
pub mod frame_buffer;
pub mod pool;
pub mod protocol;
pub mod renderer;
pub mod stats;
pub mod timings;

pub use device::{Device, OutputBuffers, OutputLoop, Reception};
pub use driver::{DriverError, DriverState, LedDriver, TransmitStatus, Waveform, WaveformHardware};
pub use error::ConfigError;
pub use pool::{Packet, PacketPool};
pub use protocol::{ConfigPacket, DebugPacket, PacketKind};
pub use renderer::{Renderer, RendererHolder, RendererId, RendererOptions, RendererSlot};
pub use timings::{Timings, validate_timings};

pub use color::{Color, Rgb};
pub use embassy_time::{Duration, Instant};

/// Board services used by the main loop.
///
/// Implement this trait to support different boards. [`OutputLoop`] is
/// generic over it.
pub trait Platform {
    /// Lets the transport deliver packets again after one was deferred.
    fn resume_receive(&mut self);

    /// Switches the indicator LED.
    fn set_indicator(&mut self, on: bool);

    /// Current time, used while waiting for the strips to latch.
    fn now(&mut self) -> Instant {
        Instant::now()
    }
}
