//! Frame and packet statistics.

use core::fmt;

use embassy_time::{Duration, Instant};

use crate::config::STATS_INTERVAL_MS;

/// Counters updated by the packet receive handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReceiveCounters {
    /// Frame packets stored by the renderer
    pub packets: u32,
    /// Frames whose last packet arrived
    pub frames: u32,
    /// Packets handed back to the transport because one was pending
    pub deferred: u32,
}

/// One reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Report {
    pub interval: Duration,
    pub received: ReceiveCounters,
    /// Frames swapped in by the main loop
    pub frames_shown: u32,
    /// Output buffers rendered and sent
    pub frames_rendered: u32,
}

impl Report {
    /// Rendered frames per second over the window.
    pub fn render_rate(&self) -> u32 {
        let millis = self.interval.as_millis().max(1);
        u32::try_from(u64::from(self.frames_rendered) * 1000 / millis).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ms: {} fps out, {} frames in, {} shown, {} packets, {} deferred",
            self.interval.as_millis(),
            self.render_rate(),
            self.received.frames,
            self.frames_shown,
            self.received.packets,
            self.received.deferred,
        )
    }
}

/// Main loop side of the statistics.
///
/// Counts are collected over fixed windows; [`Stats::roll`] closes a window
/// once [`Stats::due`] says it has elapsed.
#[derive(Debug, Clone)]
pub struct Stats {
    interval: Duration,
    window_start: Instant,
    frames_shown: u32,
    frames_rendered: u32,
    last: Option<Report>,
}

impl Stats {
    pub const fn new(now: Instant) -> Self {
        Self::with_interval(now, Duration::from_millis(STATS_INTERVAL_MS))
    }

    pub const fn with_interval(now: Instant, interval: Duration) -> Self {
        Self {
            interval,
            window_start: now,
            frames_shown: 0,
            frames_rendered: 0,
            last: None,
        }
    }

    pub fn frame_shown(&mut self) {
        self.frames_shown = self.frames_shown.wrapping_add(1);
    }

    pub fn frame_rendered(&mut self) {
        self.frames_rendered = self.frames_rendered.wrapping_add(1);
    }

    /// Whether the current window has elapsed.
    pub fn due(&self, now: Instant) -> bool {
        now.checked_duration_since(self.window_start)
            .is_some_and(|elapsed| elapsed >= self.interval)
    }

    /// Closes the current window and starts a new one at `now`.
    pub fn roll(&mut self, received: ReceiveCounters, now: Instant) -> Report {
        let report = Report {
            interval: now.checked_duration_since(self.window_start).unwrap_or(Duration::from_ticks(0)),
            received,
            frames_shown: self.frames_shown,
            frames_rendered: self.frames_rendered,
        };
        self.window_start = now;
        self.frames_shown = 0;
        self.frames_rendered = 0;
        self.last = Some(report);
        report
    }

    /// Report of the last closed window.
    pub const fn last(&self) -> Option<&Report> {
        self.last.as_ref()
    }
}
