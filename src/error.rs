use core::fmt;

/// Reasons a configuration is rejected.
///
/// None of these are fatal: the device keeps running with the null renderer
/// until a valid configuration arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Timings failed validation
    InvalidTimings,
    /// Strip count, strip length or dither bits out of range
    InvalidOptions,
    /// No renderer compiled for this format and mode combination
    UnsupportedRenderer,
    /// The frame needs more packets than the buffers can hold
    FrameTooLarge,
    /// The operator needs a deeper color than the pipeline provides
    UnsupportedDepth,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidTimings => "invalid timings",
            Self::InvalidOptions => "invalid renderer options",
            Self::UnsupportedRenderer => "renderer not compiled in",
            Self::FrameTooLarge => "not enough memory for frame",
            Self::UnsupportedDepth => "color depth too small for dithering",
        })
    }
}
