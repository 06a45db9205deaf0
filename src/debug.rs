//! Diagnostic output and fatal error handling.
//!
//! Diagnostics are printed over the serial console with `esp-println` when the
//! `esp32-log` feature is enabled and compile to nothing otherwise.

#[cfg(feature = "esp32-log")]
#[doc(hidden)]
pub use esp_println;

/// Prints a diagnostic line when logging is enabled.
#[cfg(feature = "esp32-log")]
#[macro_export]
macro_rules! diag {
    ($($arg:tt)*) => {
        $crate::debug::esp_println::println!($($arg)*)
    };
}

/// Prints a diagnostic line when logging is enabled.
#[cfg(not(feature = "esp32-log"))]
#[macro_export]
macro_rules! diag {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}

/// Reports an unrecoverable firmware bug and stops.
///
/// Used for packet accounting failures. The firmware's panic handler halts
/// and leaves the reset to the watchdog.
#[cold]
#[track_caller]
pub fn fatal(reason: &str) -> ! {
    crate::diag!("{} -- CRASH", reason);
    panic!("{reason} -- CRASH")
}
