//! USB protocol definitions shared by the device and the host.
//!
//! Every transport packet is 64 bytes long and starts with a header byte.
//! When the high bit is set the packet is a control message, otherwise it is
//! part of a frame and the low 7 bits are its index within the frame.

use crate::timings::Timings;

/// Size of a transport packet in bytes.
pub const PACKET_SIZE: usize = 64;

/// High bit of the header marks a control packet.
pub const CONTROL_FLAG: u8 = 0x80;
/// Header of a configuration packet.
pub const CONFIG_PACKET_TYPE: u8 = CONTROL_FLAG;
/// Header of a debugging packet.
pub const DEBUG_PACKET_TYPE: u8 = CONTROL_FLAG | 0x01;

/// Highest index of a frame packet.
pub const FRAME_PACKET_MAX_INDEX: u8 = 0x7f;
/// Maximum number of packets in a frame.
pub const MAX_PACKETS_PER_FRAME: usize = FRAME_PACKET_MAX_INDEX as usize + 1;

/// Length of an encoded [`ConfigPacket`].
pub const CONFIG_PACKET_SIZE: usize = 24;
/// Length of an encoded [`DebugPacket`].
pub const DEBUG_PACKET_SIZE: usize = 2;

const COLOR_FORMAT_R8G8B8: u8 = 0;
const COLOR_FORMAT_R11G11B11: u8 = 1;

const DITHER_MODE_NONE: u8 = 0;
const DITHER_MODE_TEMPORAL: u8 = 1;

const INTERPOLATE_MODE_NONE: u8 = 0;
const INTERPOLATE_MODE_LINEAR: u8 = 1;

const INDICATOR_MODE_ACTIVITY: u8 = 0;
const INDICATOR_MODE_OFF: u8 = 1;
const INDICATOR_MODE_ON: u8 = 2;

/// What a packet header announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Part of a frame, with its index
    Frame(u8),
    /// Configuration packet
    Config,
    /// Debugging packet
    Debug,
    /// Control packet with an unknown subtype
    UnknownControl(u8),
}

impl PacketKind {
    /// Classifies a packet by its header byte.
    pub const fn from_header(header: u8) -> Self {
        if header & CONTROL_FLAG == 0 {
            return Self::Frame(header & FRAME_PACKET_MAX_INDEX);
        }
        match header {
            CONFIG_PACKET_TYPE => Self::Config,
            DEBUG_PACKET_TYPE => Self::Debug,
            other => Self::UnknownControl(other),
        }
    }
}

/// Color representation of frame packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorFormat {
    /// 24-bit color, 21 pixels per packet
    R8G8B8 = COLOR_FORMAT_R8G8B8,
    /// 33-bit color with blue LSBs packed separately, 15 pixels per packet
    R11G11B11 = COLOR_FORMAT_R11G11B11,
}

impl ColorFormat {
    pub const fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            COLOR_FORMAT_R8G8B8 => Self::R8G8B8,
            COLOR_FORMAT_R11G11B11 => Self::R11G11B11,
            _ => return None,
        })
    }

    /// Bits per color component.
    pub const fn bits_per_channel(self) -> u32 {
        match self {
            Self::R8G8B8 => 8,
            Self::R11G11B11 => 11,
        }
    }
}

/// Dither applied to each pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DitherMode {
    None = DITHER_MODE_NONE,
    Temporal = DITHER_MODE_TEMPORAL,
}

impl DitherMode {
    pub const fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            DITHER_MODE_NONE => Self::None,
            DITHER_MODE_TEMPORAL => Self::Temporal,
            _ => return None,
        })
    }
}

/// Interpolation applied between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterpolateMode {
    None = INTERPOLATE_MODE_NONE,
    Linear = INTERPOLATE_MODE_LINEAR,
}

impl InterpolateMode {
    pub const fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            INTERPOLATE_MODE_NONE => Self::None,
            INTERPOLATE_MODE_LINEAR => Self::Linear,
            _ => return None,
        })
    }
}

/// Behavior of the indicator LED on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum IndicatorMode {
    /// Lit while packets are being received
    #[default]
    Activity = INDICATOR_MODE_ACTIVITY,
    Off = INDICATOR_MODE_OFF,
    On = INDICATOR_MODE_ON,
}

impl IndicatorMode {
    pub const fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            INDICATOR_MODE_ACTIVITY => Self::Activity,
            INDICATOR_MODE_OFF => Self::Off,
            INDICATOR_MODE_ON => Self::On,
            _ => return None,
        })
    }
}

/// Number of pixels carried by one frame packet (1 header byte of overhead).
pub const fn pixels_per_packet(format: ColorFormat) -> usize {
    match format {
        ColorFormat::R8G8B8 => 21,
        ColorFormat::R11G11B11 => 15,
    }
}

/// Number of packets needed for a frame.
pub const fn packets_per_frame(led_strips: usize, leds_per_strip: usize, format: ColorFormat) -> usize {
    let ppp = pixels_per_packet(format);
    (led_strips * leds_per_strip).div_ceil(ppp)
}

/// Reasons a control packet payload cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload shorter than the packed struct
    Truncated,
    /// Header byte does not match the packet type
    WrongType(u8),
    /// Enum field out of range
    InvalidField(&'static str, u8),
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Truncated => f.write_str("packet truncated"),
            Self::WrongType(header) => write!(f, "unexpected packet type {header:#04x}"),
            Self::InvalidField(name, value) => write!(f, "invalid {name} {value}"),
        }
    }
}

/// Contents of a configuration packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigPacket {
    pub led_strips: u8,
    pub leds_per_strip: u8,
    pub max_dither_bits: u8,
    pub color_format: ColorFormat,
    pub dither_mode: DitherMode,
    pub interpolate_mode: InterpolateMode,
    pub indicator_mode: IndicatorMode,
    pub timings: Timings,
}

impl Default for ConfigPacket {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ConfigPacket {
    /// Configuration applied at boot: 8 strips of 64 LEDs, 33-bit frames,
    /// dithered and interpolated.
    pub const DEFAULT: Self = Self {
        led_strips: 8,
        leds_per_strip: 64,
        max_dither_bits: 3,
        color_format: ColorFormat::R11G11B11,
        dither_mode: DitherMode::Temporal,
        interpolate_mode: InterpolateMode::Linear,
        indicator_mode: IndicatorMode::Activity,
        timings: Timings::DEFAULT,
    };

    /// Decodes the packed little-endian layout, header byte included.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < CONFIG_PACKET_SIZE {
            return Err(DecodeError::Truncated);
        }
        if data[0] != CONFIG_PACKET_TYPE {
            return Err(DecodeError::WrongType(data[0]));
        }
        let color_format = ColorFormat::from_raw(data[4])
            .ok_or(DecodeError::InvalidField("color format", data[4]))?;
        let dither_mode = DitherMode::from_raw(data[5])
            .ok_or(DecodeError::InvalidField("dither mode", data[5]))?;
        let interpolate_mode = InterpolateMode::from_raw(data[6])
            .ok_or(DecodeError::InvalidField("interpolate mode", data[6]))?;
        let indicator_mode = IndicatorMode::from_raw(data[7])
            .ok_or(DecodeError::InvalidField("indicator mode", data[7]))?;

        Ok(Self {
            led_strips: data[1],
            leds_per_strip: data[2],
            max_dither_bits: data[3],
            color_format,
            dither_mode,
            interpolate_mode,
            indicator_mode,
            timings: Timings {
                frequency: read_u32(data, 8),
                reset_interval: read_u32(data, 12),
                t0h: read_u32(data, 16),
                t1h: read_u32(data, 20),
            },
        })
    }

    /// Encodes the packet as sent by the host.
    pub fn encode(&self) -> [u8; CONFIG_PACKET_SIZE] {
        let mut out = [0; CONFIG_PACKET_SIZE];
        out[0] = CONFIG_PACKET_TYPE;
        out[1] = self.led_strips;
        out[2] = self.leds_per_strip;
        out[3] = self.max_dither_bits;
        out[4] = self.color_format as u8;
        out[5] = self.dither_mode as u8;
        out[6] = self.interpolate_mode as u8;
        out[7] = self.indicator_mode as u8;
        out[8..12].copy_from_slice(&self.timings.frequency.to_le_bytes());
        out[12..16].copy_from_slice(&self.timings.reset_interval.to_le_bytes());
        out[16..20].copy_from_slice(&self.timings.t0h.to_le_bytes());
        out[20..24].copy_from_slice(&self.timings.t1h.to_le_bytes());
        out
    }
}

/// Contents of a debugging packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugPacket {
    /// Print statistics to the serial port periodically
    pub print_stats: bool,
}

impl DebugPacket {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < DEBUG_PACKET_SIZE {
            return Err(DecodeError::Truncated);
        }
        if data[0] != DEBUG_PACKET_TYPE {
            return Err(DecodeError::WrongType(data[0]));
        }
        Ok(Self {
            print_stats: data[1] != 0,
        })
    }

    pub fn encode(&self) -> [u8; DEBUG_PACKET_SIZE] {
        [DEBUG_PACKET_TYPE, u8::from(self.print_stats)]
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Writes a 24-bit pixel into a frame packet.
///
/// `offset` is the pixel position within the packet.
pub fn write_pixel24(packet: &mut [u8; PACKET_SIZE], offset: usize, r: u8, g: u8, b: u8) {
    let start = 1 + offset * 3;
    packet[start..start + 3].copy_from_slice(&[r, g, b]);
}

/// Writes an 11-bit-per-channel pixel into a frame packet.
///
/// The 10 high bits of blue share a little-endian word with red and green,
/// the blue LSB goes into a bitmap at byte 2.
pub fn write_pixel33(packet: &mut [u8; PACKET_SIZE], offset: usize, r: u16, g: u16, b: u16) {
    let word = (u32::from(r & 0x7ff) << 21) | (u32::from(g & 0x7ff) << 10) | u32::from((b & 0x7ff) >> 1);
    let start = 4 + offset * 4;
    packet[start..start + 4].copy_from_slice(&word.to_le_bytes());

    let mut blues = u16::from_le_bytes([packet[2], packet[3]]);
    blues = (blues & !(1 << offset)) | ((b & 1) << offset);
    packet[2..4].copy_from_slice(&blues.to_le_bytes());
}
