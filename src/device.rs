//! Ties packet reception to rendering and output.
//!
//! [`Device`] is the state shared between the transport's receive interrupt
//! and the main loop. It is meant to live in a `static`. [`OutputLoop`] is
//! owned by the main loop: it applies configuration changes, swaps frames in,
//! renders and hands the result to the LED driver.
//!
//! Flags crossing the two contexts have a single writer in the interrupt and
//! a single consumer in the loop. While a frame or control packet waits for
//! the loop, further packets of the same kind are handed back to the
//! transport, which pauses reception until [`Platform::resume_receive`].

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::{CriticalSection, Mutex};
use embassy_time::Instant;

use crate::config::OUTPUT_BUFFER_SIZE;
use crate::diag;
use crate::driver::{LedDriver, WaveformHardware};
use crate::error::ConfigError;
use crate::pool::{Packet, PacketPool};
use crate::protocol::{ConfigPacket, DebugPacket, IndicatorMode, PACKET_SIZE, PacketKind};
use crate::renderer::{Renderer, RendererHolder, RendererId, RendererOptions};
use crate::stats::{ReceiveCounters, Report, Stats};
use crate::Platform;

/// The pair of DMA output buffers.
///
/// One is transmitted while the other is rendered. Firmware places them in
/// memory the DMA engine can reach.
pub type OutputBuffers = [[u8; OUTPUT_BUFFER_SIZE]; 2];

/// What the receive handler did with a packet.
#[derive(Debug)]
#[must_use]
pub enum Reception<'a> {
    /// The packet was stored or consumed
    Accepted,
    /// A packet of the same kind is still pending. The transport keeps this
    /// one and pauses reception until the main loop resumes it.
    Deferred(Packet<'a>),
}

impl Reception<'_> {
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

/// State shared between the receive interrupt and the main loop.
pub struct Device<'a> {
    pool: &'a PacketPool,
    renderer: Mutex<RefCell<RendererHolder<'a>>>,
    frame_ready: AtomicBool,
    config_changed: AtomicBool,
    debug_changed: AtomicBool,
    control_deferred: AtomicBool,
    activity: AtomicBool,
    pending_config: Mutex<Cell<ConfigPacket>>,
    pending_debug: Mutex<Cell<DebugPacket>>,
    counters: Mutex<Cell<ReceiveCounters>>,
}

impl<'a> Device<'a> {
    /// Creates the device with the boot configuration pending.
    pub const fn new(pool: &'a PacketPool) -> Self {
        Self::with_holder(pool, RendererHolder::new(pool))
    }

    /// Creates the device around a holder, usually one with a reduced
    /// renderer table.
    pub const fn with_holder(pool: &'a PacketPool, holder: RendererHolder<'a>) -> Self {
        Self {
            pool,
            renderer: Mutex::new(RefCell::new(holder)),
            frame_ready: AtomicBool::new(false),
            config_changed: AtomicBool::new(true),
            debug_changed: AtomicBool::new(false),
            control_deferred: AtomicBool::new(false),
            activity: AtomicBool::new(false),
            pending_config: Mutex::new(Cell::new(ConfigPacket::DEFAULT)),
            pending_debug: Mutex::new(Cell::new(DebugPacket { print_stats: false })),
            counters: Mutex::new(Cell::new(ReceiveCounters {
                packets: 0,
                frames: 0,
                deferred: 0,
            })),
        }
    }

    pub const fn pool(&self) -> &'a PacketPool {
        self.pool
    }

    /// Handles a packet from the transport. Called from interrupt context.
    ///
    /// `len` is the number of valid bytes. Every packet is either stored,
    /// freed, or handed back in [`Reception::Deferred`].
    pub fn on_packet(&self, packet: Packet<'a>, len: usize, now: Instant) -> Reception<'a> {
        self.activity.store(true, Ordering::Relaxed);
        let len = len.min(PACKET_SIZE);

        match PacketKind::from_header(packet.header()) {
            PacketKind::Frame(index) => self.on_frame_packet(usize::from(index), packet, len, now),
            PacketKind::Config => {
                if self.config_changed.load(Ordering::Acquire) {
                    return self.defer_control(packet);
                }
                match ConfigPacket::decode(&packet.bytes()[..len]) {
                    Ok(config) => {
                        critical_section::with(|cs| self.pending_config.borrow(cs).set(config));
                        self.config_changed.store(true, Ordering::Release);
                    }
                    Err(err) => diag!("config packet dropped: {}", err),
                }
                Reception::Accepted
            }
            PacketKind::Debug => {
                if self.debug_changed.load(Ordering::Acquire) {
                    return self.defer_control(packet);
                }
                match DebugPacket::decode(&packet.bytes()[..len]) {
                    Ok(debug) => {
                        critical_section::with(|cs| self.pending_debug.borrow(cs).set(debug));
                        self.debug_changed.store(true, Ordering::Release);
                    }
                    Err(err) => diag!("debug packet dropped: {}", err),
                }
                Reception::Accepted
            }
            PacketKind::UnknownControl(_) => Reception::Accepted,
        }
    }

    fn on_frame_packet(&self, index: usize, packet: Packet<'a>, len: usize, now: Instant) -> Reception<'a> {
        if self.frame_ready.load(Ordering::Acquire) {
            return self.defer(packet);
        }

        let complete = critical_section::with(|cs| {
            let complete = self
                .renderer
                .borrow_ref_mut(cs)
                .get_mut()
                .store_frame_packet(index, packet, len, now);

            let counters = self.counters.borrow(cs);
            let mut counts = counters.get();
            counts.packets = counts.packets.wrapping_add(1);
            if complete {
                counts.frames = counts.frames.wrapping_add(1);
            }
            counters.set(counts);
            complete
        });

        if complete {
            self.frame_ready.store(true, Ordering::Release);
        }
        Reception::Accepted
    }

    fn defer_control(&self, packet: Packet<'a>) -> Reception<'a> {
        self.control_deferred.store(true, Ordering::Release);
        self.defer(packet)
    }

    fn defer(&self, packet: Packet<'a>) -> Reception<'a> {
        critical_section::with(|cs| {
            let counters = self.counters.borrow(cs);
            let mut counts = counters.get();
            counts.deferred = counts.deferred.wrapping_add(1);
            counters.set(counts);
        });
        Reception::Deferred(packet)
    }

    /// Returns `true` while a complete frame waits to be swapped in.
    pub fn frame_ready(&self) -> bool {
        self.frame_ready.load(Ordering::Acquire)
    }

    /// Returns `true` while a configuration waits to be applied.
    pub fn config_pending(&self) -> bool {
        self.config_changed.load(Ordering::Acquire)
    }

    /// Runs `f` on the renderer holder.
    ///
    /// Interrupts are masked while `f` runs.
    pub fn with_renderer<R>(&self, f: impl FnOnce(&mut RendererHolder<'a>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.renderer.borrow_ref_mut(cs)))
    }

    fn take_config(&self) -> Option<ConfigPacket> {
        critical_section::with(|cs| {
            take_flag(cs, &self.config_changed).then(|| self.pending_config.borrow(cs).get())
        })
    }

    fn take_debug(&self) -> Option<DebugPacket> {
        critical_section::with(|cs| {
            take_flag(cs, &self.debug_changed).then(|| self.pending_debug.borrow(cs).get())
        })
    }

    fn take_control_deferred(&self) -> bool {
        critical_section::with(|cs| take_flag(cs, &self.control_deferred))
    }

    fn take_activity(&self) -> bool {
        critical_section::with(|cs| take_flag(cs, &self.activity))
    }

    fn take_counters(&self) -> ReceiveCounters {
        critical_section::with(|cs| self.counters.borrow(cs).take())
    }

    /// Applies a configuration to the renderer.
    fn configure_renderer(&self, config: &ConfigPacket) -> Result<(), ConfigError> {
        let id = RendererId::new(config.color_format, config.dither_mode, config.interpolate_mode);
        let options = RendererOptions::new(
            usize::from(config.led_strips),
            usize::from(config.leds_per_strip),
            u32::from(config.max_dither_bits),
        );
        self.with_renderer(|holder| holder.init(id, options))
    }
}

/// Main loop half of the device.
///
/// `'d` borrows the device and the output memory, `'a` is the lifetime of
/// the packet pool behind the device.
pub struct OutputLoop<'d, 'a, H: WaveformHardware, P: Platform> {
    device: &'d Device<'a>,
    driver: LedDriver<'d, H>,
    platform: P,
    buffers: &'d mut OutputBuffers,
    back: usize,
    indicator: IndicatorMode,
    print_stats: bool,
    stats: Stats,
}

impl<'d, 'a, H: WaveformHardware, P: Platform> OutputLoop<'d, 'a, H, P> {
    pub fn new(
        device: &'d Device<'a>,
        driver: LedDriver<'d, H>,
        platform: P,
        buffers: &'d mut OutputBuffers,
        now: Instant,
    ) -> Self {
        Self {
            device,
            driver,
            platform,
            buffers,
            back: 0,
            indicator: IndicatorMode::default(),
            print_stats: false,
            stats: Stats::new(now),
        }
    }

    pub const fn driver(&self) -> &LedDriver<'d, H> {
        &self.driver
    }

    pub const fn platform(&self) -> &P {
        &self.platform
    }

    pub const fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub const fn stats(&self) -> &Stats {
        &self.stats
    }

    pub const fn print_stats(&self) -> bool {
        self.print_stats
    }

    /// Buffer most recently handed to the driver.
    pub fn front_buffer(&self) -> &[u8; OUTPUT_BUFFER_SIZE] {
        &self.buffers[self.back ^ 1]
    }

    /// Runs one iteration of the main loop.
    ///
    /// Returns `true` if a frame was sent to the strips.
    pub fn poll(&mut self, now: Instant) -> bool {
        let config = self.device.take_config();
        let debug = self.device.take_debug();
        if let Some(config) = &config {
            self.apply_config(config);
        }
        if let Some(debug) = debug {
            self.print_stats = debug.print_stats;
        }
        // a control packet handed back while this one was pending can be
        // received again
        if (config.is_some() || debug.is_some()) && self.device.take_control_deferred() {
            self.platform.resume_receive();
        }

        if self.device.frame_ready() {
            self.device.with_renderer(|holder| holder.get_mut().advance_frame());
            self.device.frame_ready.store(false, Ordering::Release);
            self.platform.resume_receive();
            self.stats.frame_shown();
        }

        let written = self.render_and_write(now);
        self.update_indicator();

        if self.stats.due(now) {
            let report = self.stats.roll(self.device.take_counters(), now);
            if self.print_stats {
                report_stats(&report);
            }
        }
        written
    }

    fn render_and_write(&mut self, now: Instant) -> bool {
        let back = &mut self.buffers[self.back];
        let rendered = self.device.with_renderer(|holder| holder.get_mut().render(back, now));
        if !rendered {
            return false;
        }

        let platform = &mut self.platform;
        self.driver.wait_ready(|| platform.now());
        if let Err(err) = self.driver.write(&self.buffers[self.back]) {
            diag!("output failed: {}", err);
            return false;
        }
        self.back ^= 1;
        self.stats.frame_rendered();
        true
    }

    fn apply_config(&mut self, config: &ConfigPacket) {
        self.indicator = config.indicator_mode;

        // The renderer goes first so a failed driver setup leaves nothing
        // to render.
        self.device.with_renderer(RendererHolder::clear);
        if self.device.frame_ready() {
            self.device.frame_ready.store(false, Ordering::Release);
            self.platform.resume_receive();
        }

        if let Err(err) = self.driver.init(usize::from(config.leds_per_strip), &config.timings) {
            diag!("driver init failed: {}", err);
            return;
        }
        if let Err(err) = self.device.configure_renderer(config) {
            diag!("renderer init failed: {}", err);
        }
    }

    fn update_indicator(&mut self) {
        let lit = match self.indicator {
            IndicatorMode::Activity => self.device.take_activity(),
            IndicatorMode::Off => false,
            IndicatorMode::On => true,
        };
        self.platform.set_indicator(lit);
    }
}

/// Clears `flag` and returns its previous value.
///
/// A load then a store, as targets without compare-and-swap have no atomic
/// `swap`. The critical section keeps the interrupt from setting the flag in
/// between.
fn take_flag(_cs: CriticalSection<'_>, flag: &AtomicBool) -> bool {
    let value = flag.load(Ordering::Acquire);
    flag.store(false, Ordering::Release);
    value
}

fn report_stats(report: &Report) {
    diag!("stats: {}", report);
}
