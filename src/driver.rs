//! Timer/DMA driver for parallel LED output.
//!
//! The waveform for 8 strips is produced entirely by chained DMA transfers
//! triggered by timer edges, so the CPU is free while a frame goes out:
//!
//! - at the start of each bit cycle one channel drives all pins high,
//! - at the `t0h` edge another channel writes the data byte (pins with a 0
//!   bit go low),
//! - at the `t1h` edge a third channel drives all pins low.
//!
//! The hardware specific register work sits behind [`WaveformHardware`];
//! this module owns the state machine and the arming sequence.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use embassy_time::{Duration, Instant};

use crate::bitplane::buffer_size;
use crate::config::MAX_LEDS_PER_STRIP;
use crate::timings::Timings;

/// Timer and DMA setup for one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waveform {
    /// Timer ticks per bit, rounded to nearest
    pub period_ticks: u32,
    /// Timer ticks before the data edge
    pub t0h_ticks: u32,
    /// Timer ticks before the clear edge
    pub t1h_ticks: u32,
    /// Bytes moved by the data channel per frame
    pub transfer_len: usize,
}

impl Waveform {
    /// Computes the waveform for a timer clocked at `bus_clock_hz`.
    ///
    /// Returns `None` if `timings` are out of bounds.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(bus_clock_hz: u32, timings: &Timings, leds_per_strip: usize) -> Option<Self> {
        if !timings.is_valid() {
            return None;
        }
        let period = (bus_clock_hz as u64 + timings.frequency as u64 / 2) / timings.frequency as u64;
        Some(Self {
            period_ticks: period as u32,
            t0h_ticks: ((period * timings.t0h as u64) >> 8) as u32,
            t1h_ticks: ((period * timings.t1h as u64) >> 8) as u32,
            transfer_len: buffer_size(leds_per_strip),
        })
    }
}

/// Register level access to the timer and DMA channels.
///
/// Implemented per board. [`LedDriver`] calls the `write` steps in order
/// with interrupts masked.
pub trait WaveformHardware {
    /// Stops the timer, programs period and duty cycles, sets up the DMA
    /// descriptors for `transfer_len` bytes and restarts the timer.
    fn configure(&mut self, waveform: &Waveform);

    /// Points the data channel at the next buffer.
    ///
    /// The buffer must stay untouched until the transfer completes.
    fn load(&mut self, buffer: &[u8]);

    /// Resets the data edge trigger so it cannot fire as soon as requests
    /// are enabled.
    fn disarm_data_trigger(&mut self);

    /// Waits for the clear edge to elapse twice, which leaves the timer at a
    /// known point of the cycle.
    fn wait_cycle_boundary(&mut self);

    /// Clears the pending cycle-start event, enables the set, data and clear
    /// channels in that order and restores the edge triggers.
    ///
    /// Must happen between the clear edge and the next cycle start, or the
    /// first bits come out corrupted.
    fn arm(&mut self);
}

/// Reasons the driver refuses a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// Strip length is zero or above the compiled maximum
    InvalidLength,
    /// Timings failed validation
    InvalidTimings,
    /// `write` before a successful `init`
    NotConfigured,
    /// Buffer shorter than the configured transfer
    BufferTooSmall,
    /// A transfer is still running
    Busy,
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::InvalidLength => "invalid strip length",
            Self::InvalidTimings => "invalid timings",
            Self::NotConfigured => "driver not configured",
            Self::BufferTooSmall => "output buffer too small",
            Self::Busy => "transfer in progress",
        })
    }
}

/// Transfer state shared with the DMA completion interrupt.
///
/// The interrupt only calls [`TransmitStatus::complete`]; the main loop only
/// reads.
pub struct TransmitStatus {
    in_progress: AtomicBool,
    finished_at: Mutex<Cell<Instant>>,
}

impl TransmitStatus {
    pub const fn new() -> Self {
        Self {
            in_progress: AtomicBool::new(false),
            finished_at: Mutex::new(Cell::new(Instant::from_ticks(0))),
        }
    }

    /// Records the end of a transfer. Called from the completion interrupt.
    pub fn complete(&self, now: Instant) {
        critical_section::with(|cs| self.finished_at.borrow(cs).set(now));
        self.in_progress.store(false, Ordering::Release);
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Time the last transfer completed.
    pub fn finished_at(&self) -> Instant {
        critical_section::with(|cs| self.finished_at.borrow(cs).get())
    }

    fn begin(&self) {
        self.in_progress.store(true, Ordering::Release);
    }
}

impl Default for TransmitStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of the output driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Never configured
    Idle,
    /// Reprogramming the timer and DMA
    Configuring,
    /// Configured, no transfer running
    Ready,
    /// A transfer is running
    Transmitting,
}

/// Drives up to 8 strips from a bit-plane buffer.
pub struct LedDriver<'a, H: WaveformHardware> {
    hardware: H,
    status: &'a TransmitStatus,
    bus_clock_hz: u32,
    configuring: bool,
    timings: Option<Timings>,
    waveform: Option<Waveform>,
}

impl<'a, H: WaveformHardware> LedDriver<'a, H> {
    pub const fn new(hardware: H, status: &'a TransmitStatus, bus_clock_hz: u32) -> Self {
        Self {
            hardware,
            status,
            bus_clock_hz,
            configuring: false,
            timings: None,
            waveform: None,
        }
    }

    pub fn state(&self) -> DriverState {
        if self.configuring {
            DriverState::Configuring
        } else if self.waveform.is_none() {
            DriverState::Idle
        } else if self.status.is_in_progress() {
            DriverState::Transmitting
        } else {
            DriverState::Ready
        }
    }

    pub const fn timings(&self) -> Option<&Timings> {
        self.timings.as_ref()
    }

    pub const fn waveform(&self) -> Option<&Waveform> {
        self.waveform.as_ref()
    }

    pub const fn hardware(&self) -> &H {
        &self.hardware
    }

    /// (Re)configures the output for strips of `leds_per_strip` LEDs.
    ///
    /// Invalid parameters are rejected before anything is touched. Otherwise
    /// waits for a running transfer to finish and reprograms the hardware.
    pub fn init(&mut self, leds_per_strip: usize, timings: &Timings) -> Result<(), DriverError> {
        if leds_per_strip == 0 || leds_per_strip > MAX_LEDS_PER_STRIP {
            return Err(DriverError::InvalidLength);
        }
        let Some(waveform) = Waveform::new(self.bus_clock_hz, timings, leds_per_strip) else {
            return Err(DriverError::InvalidTimings);
        };

        while self.status.is_in_progress() {
            core::hint::spin_loop();
        }

        self.configuring = true;
        self.hardware.configure(&waveform);
        self.waveform = Some(waveform);
        self.timings = Some(*timings);
        self.configuring = false;
        Ok(())
    }

    /// Returns `true` once the last transfer has finished.
    pub fn write_finished(&self) -> bool {
        !self.status.is_in_progress()
    }

    /// Returns `true` if the strips can take a new frame: the last transfer
    /// finished and the reset interval has elapsed since.
    pub fn ready(&self, now: Instant) -> bool {
        let Some(timings) = self.timings else {
            return false;
        };
        if self.status.is_in_progress() {
            return false;
        }
        let latch = Duration::from_micros(u64::from(timings.reset_interval));
        now >= self.status.finished_at() + latch
    }

    /// Busy-waits until [`ready`](Self::ready), reading the time from `clock`.
    ///
    /// There is no timeout: a transfer that never completes is left to the
    /// watchdog. Returns immediately if the driver is not configured.
    pub fn wait_ready(&self, mut clock: impl FnMut() -> Instant) {
        if self.timings.is_none() {
            return;
        }
        while !self.ready(clock()) {
            core::hint::spin_loop();
        }
    }

    /// Starts sending `buffer` and returns immediately.
    ///
    /// The caller must have waited for [`ready`](Self::ready) and must leave
    /// the buffer untouched until [`write_finished`](Self::write_finished).
    pub fn write(&mut self, buffer: &[u8]) -> Result<(), DriverError> {
        let Some(waveform) = self.waveform else {
            return Err(DriverError::NotConfigured);
        };
        if buffer.len() < waveform.transfer_len {
            return Err(DriverError::BufferTooSmall);
        }
        if self.status.is_in_progress() {
            return Err(DriverError::Busy);
        }

        self.status.begin();
        self.hardware.load(&buffer[..waveform.transfer_len]);

        let hardware = &mut self.hardware;
        critical_section::with(|_| {
            hardware.disarm_data_trigger();
            hardware.wait_cycle_boundary();
            hardware.arm();
        });
        Ok(())
    }
}
