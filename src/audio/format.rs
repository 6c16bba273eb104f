//! PCM format accepted by the sink

use std::fmt;

use crate::error::{RaopError, Result};

/// Sample encoding of caller-supplied PCM
///
/// Only `I16` can be streamed; the others exist so a mismatched source is
/// reported instead of played as noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Signed 16-bit, native endian
    I16,
    /// Signed 24-bit, packed
    I24,
    /// Signed 32-bit
    I32,
    /// IEEE float
    F32,
}

impl SampleFormat {
    #[must_use]
    pub const fn bits_per_sample(self) -> u8 {
        match self {
            Self::I16 => 16,
            Self::I24 => 24,
            Self::I32 | Self::F32 => 32,
        }
    }

    #[must_use]
    pub const fn bytes_per_sample(self) -> usize {
        self.bits_per_sample() as usize / 8
    }
}

/// Layout of the PCM passed to `AudioSink::put_audio`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_format: SampleFormat,
    /// Hz
    pub sample_rate: u32,
    /// Interleaved channels
    pub channels: u16,
}

impl AudioFormat {
    /// 44.1 kHz 16-bit stereo
    pub const CD_QUALITY: Self = Self {
        sample_format: SampleFormat::I16,
        sample_rate: 44_100,
        channels: 2,
    };

    /// One sample for every channel
    #[must_use]
    pub fn bytes_per_frame(&self) -> usize {
        usize::from(self.channels) * self.sample_format.bytes_per_sample()
    }

    /// # Errors
    /// `UnsupportedFormat` unless this is `CD_QUALITY`.
    pub fn ensure_supported(&self) -> Result<()> {
        if *self != Self::CD_QUALITY {
            return Err(RaopError::UnsupportedFormat {
                format: self.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::CD_QUALITY
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            sample_format,
            sample_rate,
            channels,
        } = self;
        let bits = sample_format.bits_per_sample();
        write!(f, "{sample_rate} Hz / {channels} ch / {bits}-bit {sample_format:?}")
    }
}
