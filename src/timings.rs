//! LED protocol timings for WS2811, WS2812B and SK6812 strips.

/// Lowest accepted bit frequency in Hz.
pub const MIN_FREQUENCY: u32 = 100_000;
/// Highest accepted bit frequency in Hz.
pub const MAX_FREQUENCY: u32 = 2_000_000;
/// Longest accepted reset interval in microseconds.
///
/// The watchdog trips at 10 ms, so the latch period must stay well below it.
pub const MAX_RESET_INTERVAL: u32 = 5_000;

/// Timings for the LED output protocol.
///
/// Can be tuned per LED model. Replaced wholesale on reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Bit frequency in Hz, typically 400 or 800 kHz
    pub frequency: u32,
    /// Idle time between frames in microseconds
    pub reset_interval: u32,
    /// High time of a 0 bit, as a fraction of the cycle (0-255)
    pub t0h: u32,
    /// High time of a 1 bit, as a fraction of the cycle (0-255)
    pub t1h: u32,
}

const NAME_DEFAULT: &str = "default";
const NAME_SK6812: &str = "sk6812";
const NAME_SK6812_FAST: &str = "sk6812-fast";
const NAME_SK6812_EXTREME: &str = "sk6812-extreme";

impl Timings {
    /// WS2811/WS2812B timings: 800 kHz, roughly 23% and 69% high time.
    pub const DEFAULT: Self = Self::new(800_000, 300, 60, 176);
    /// SK6812 accepts a shorter reset interval.
    pub const SK6812: Self = Self::new(800_000, 100, 56, 172);
    /// SK6812 overclocked to 900 kHz.
    pub const SK6812_FAST: Self = Self::new(900_000, 100, 44, 150);
    /// SK6812 overclocked to 1 MHz.
    pub const SK6812_EXTREME: Self = Self::new(1_000_000, 80, 40, 140);

    pub const fn new(frequency: u32, reset_interval: u32, t0h: u32, t1h: u32) -> Self {
        Self {
            frequency,
            reset_interval,
            t0h,
            t1h,
        }
    }

    /// Returns `true` when the timings are within sane bounds.
    ///
    /// This does not promise that a strip will latch the data, only that
    /// programming the timer with these values cannot wedge the board.
    pub const fn is_valid(&self) -> bool {
        self.frequency >= MIN_FREQUENCY
            && self.frequency <= MAX_FREQUENCY
            && self.reset_interval <= MAX_RESET_INTERVAL
            && self.t0h > 0
            && self.t1h > self.t0h
            && self.t1h <= 255
    }

    /// Looks up a named preset.
    pub fn by_name(name: &str) -> Option<Self> {
        Some(match name {
            NAME_DEFAULT => Self::DEFAULT,
            NAME_SK6812 => Self::SK6812,
            NAME_SK6812_FAST => Self::SK6812_FAST,
            NAME_SK6812_EXTREME => Self::SK6812_EXTREME,
            _ => return None,
        })
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Validates timings before they reach any hardware register.
pub const fn validate_timings(timings: &Timings) -> bool {
    timings.is_valid()
}
