//! WAV header value types.
//!
//! A header is assembled in two phases: `WavFormat` comes from the format
//! chunk, `DataBounds` from locating the data chunk. `WavHeader` exists only
//! once both are known.

use crate::error::{Result, WavError};

const MICROS_PER_SECOND: u64 = 1_000_000;

/// Format types this crate accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    /// Integer PCM audio data.
    Pcm,
    /// Extended WAVE format carrying PCM.
    Extensible,
}

impl FormatType {
    pub const PCM_CODE: u16 = 0x0001;
    pub const EXTENSIBLE_CODE: u16 = 0xFFFE;

    /// Map a format tag to a supported type, or `None` if unsupported.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            Self::PCM_CODE => Some(FormatType::Pcm),
            Self::EXTENSIBLE_CODE => Some(FormatType::Extensible),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            FormatType::Pcm => Self::PCM_CODE,
            FormatType::Extensible => Self::EXTENSIBLE_CODE,
        }
    }
}

/// Format parameters decoded from the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    format_type: FormatType,
    num_channels: u16,
    sample_rate_hz: u32,
    average_bytes_per_second: u32,
    block_alignment: u16,
    bits_per_sample: u16,
}

impl WavFormat {
    /// Build a format, rejecting a block alignment that disagrees with
    /// `num_channels * bits_per_sample / 8`.
    pub fn new(
        format_type: FormatType,
        num_channels: u16,
        sample_rate_hz: u32,
        average_bytes_per_second: u32,
        block_alignment: u16,
        bits_per_sample: u16,
    ) -> Result<Self> {
        let expected = expected_block_alignment(num_channels, bits_per_sample);
        if u32::from(block_alignment) != expected {
            return Err(WavError::BlockAlignmentMismatch {
                expected,
                actual: block_alignment,
            });
        }
        Ok(WavFormat {
            format_type,
            num_channels,
            sample_rate_hz,
            average_bytes_per_second,
            block_alignment,
            bits_per_sample,
        })
    }

    pub fn format_type(&self) -> FormatType {
        self.format_type
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn average_bytes_per_second(&self) -> u32 {
        self.average_bytes_per_second
    }

    pub fn block_alignment(&self) -> u16 {
        self.block_alignment
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Bytes in one frame holding a sample for every channel.
    pub fn bytes_per_frame(&self) -> u16 {
        self.block_alignment
    }

    /// Bitrate in bits per second, as declared by the byte rate field.
    pub fn bitrate(&self) -> u64 {
        u64::from(self.average_bytes_per_second) * 8
    }
}

pub(crate) fn expected_block_alignment(num_channels: u16, bits_per_sample: u16) -> u32 {
    u32::from(num_channels) * u32::from(bits_per_sample) / 8
}

/// Location of the sample data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBounds {
    /// Absolute offset of the first sample byte.
    pub start: u64,
    /// Declared length of the data chunk in bytes.
    pub size: i64,
}

impl DataBounds {
    pub fn end(&self) -> u64 {
        self.start + self.size.max(0) as u64
    }
}

/// A fully parsed WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    format: WavFormat,
    data: DataBounds,
}

impl WavHeader {
    pub fn new(format: WavFormat, data: DataBounds) -> Self {
        WavHeader { format, data }
    }

    pub fn format(&self) -> &WavFormat {
        &self.format
    }

    pub fn data_bounds(&self) -> DataBounds {
        self.data
    }

    pub fn num_channels(&self) -> u16 {
        self.format.num_channels
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.format.sample_rate_hz
    }

    pub fn average_bytes_per_second(&self) -> u32 {
        self.format.average_bytes_per_second
    }

    pub fn block_alignment(&self) -> u16 {
        self.format.block_alignment
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.format.bits_per_sample
    }

    pub fn data_start_position(&self) -> u64 {
        self.data.start
    }

    pub fn data_size(&self) -> i64 {
        self.data.size
    }

    pub fn data_end(&self) -> u64 {
        self.data.end()
    }

    pub fn bytes_per_frame(&self) -> u16 {
        self.format.bytes_per_frame()
    }

    /// Number of whole frames in the data region.
    pub fn frame_count(&self) -> u64 {
        match self.format.block_alignment {
            0 => 0,
            block => self.data.size.max(0) as u64 / u64::from(block),
        }
    }

    /// Playback duration in microseconds.
    pub fn duration_us(&self) -> u64 {
        match self.format.sample_rate_hz {
            0 => 0,
            rate => scale(self.frame_count(), MICROS_PER_SECOND, u64::from(rate)),
        }
    }

    /// Time in microseconds of a byte offset relative to the data start.
    pub fn time_us(&self, data_offset: u64) -> u64 {
        match self.format.average_bytes_per_second {
            0 => 0,
            rate => scale(data_offset, MICROS_PER_SECOND, u64::from(rate)),
        }
    }

    /// Absolute stream position of the frame playing at `time_us`.
    ///
    /// The result is aligned to a frame boundary and clamped to the last
    /// frame of the data region.
    pub fn position_for_time_us(&self, time_us: u64) -> u64 {
        let block = u64::from(self.format.block_alignment);
        if block == 0 {
            return self.data.start;
        }
        let offset = scale(
            time_us,
            u64::from(self.format.average_bytes_per_second),
            MICROS_PER_SECOND,
        );
        let offset = offset / block * block;
        let last_frame = (self.data.size.max(0) as u64).saturating_sub(block) / block * block;
        self.data.start + offset.min(last_frame)
    }
}

fn scale(value: u64, multiplier: u64, divisor: u64) -> u64 {
    let scaled = u128::from(value) * u128::from(multiplier) / u128::from(divisor);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}
