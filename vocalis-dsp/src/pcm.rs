//! PCM stream geometry and the raw sample codec
//!
//! Every processing stage shares one `PcmFormat`: it defines how many bytes
//! a sample occupies, how to decode/encode it, and the valid integer range.
//! Callers iterate over whole-frame-aligned offsets; the codec itself never
//! buffers.

use crate::error::DspError;

/// Sample bit depth. Closed set so the codec never has to re-validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    #[default]
    Sixteen,
    ThirtyTwo,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(&self) -> u32 {
        match self {
            BitDepth::Sixteen => 16,
            BitDepth::ThirtyTwo => 32,
        }
    }

    /// Parse from a bit count. Anything other than 16 or 32 is a
    /// configuration error.
    pub fn from_bits(bits: u32) -> Result<Self, DspError> {
        match bits {
            16 => Ok(BitDepth::Sixteen),
            32 => Ok(BitDepth::ThirtyTwo),
            other => Err(DspError::UnsupportedBitDepth(other)),
        }
    }
}

/// Byte order of samples on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Shared geometry of a PCM byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    bit_depth: BitDepth,
    endianness: Endianness,
    sample_rate: u32,
    channels: u32,
}

impl PcmFormat {
    /// Create a format. Sample rate and channel count must be positive.
    pub fn new(
        bit_depth: BitDepth,
        endianness: Endianness,
        sample_rate: u32,
        channels: u32,
    ) -> Result<Self, DspError> {
        if sample_rate == 0 {
            return Err(DspError::InvalidSampleRate(sample_rate as f64));
        }
        if channels == 0 {
            return Err(DspError::InvalidChannelCount(channels));
        }
        Ok(Self {
            bit_depth,
            endianness,
            sample_rate,
            channels,
        })
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Bytes occupied by one sample.
    pub fn bytes_per_sample(&self) -> usize {
        (self.bit_depth.bits() / 8) as usize
    }

    /// Bytes occupied by one frame (one sample per channel).
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }

    /// `2^(bit_depth - 1)`. Valid samples lie in `[-extremum, extremum - 1]`.
    pub fn extremum(&self) -> i64 {
        1i64 << (self.bit_depth.bits() - 1)
    }

    /// Change the sample rate mid-stream (resampler target geometry).
    /// Bit depth and channel layout never change on a live stream.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), DspError> {
        if sample_rate == 0 {
            return Err(DspError::InvalidSampleRate(sample_rate as f64));
        }
        self.sample_rate = sample_rate;
        Ok(())
    }

    /// Clamp a value to the valid sample range.
    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(-self.extremum(), self.extremum() - 1)
    }

    /// Read one sample at `offset`. The caller keeps offsets frame aligned
    /// and in bounds (`offset + bytes_per_sample() <= buf.len()`).
    pub fn read_sample(&self, buf: &[u8], offset: usize) -> i64 {
        match (self.bit_depth, self.endianness) {
            (BitDepth::Sixteen, Endianness::Little) => {
                i16::from_le_bytes([buf[offset], buf[offset + 1]]) as i64
            }
            (BitDepth::Sixteen, Endianness::Big) => {
                i16::from_be_bytes([buf[offset], buf[offset + 1]]) as i64
            }
            (BitDepth::ThirtyTwo, Endianness::Little) => i32::from_le_bytes([
                buf[offset],
                buf[offset + 1],
                buf[offset + 2],
                buf[offset + 3],
            ]) as i64,
            (BitDepth::ThirtyTwo, Endianness::Big) => i32::from_be_bytes([
                buf[offset],
                buf[offset + 1],
                buf[offset + 2],
                buf[offset + 3],
            ]) as i64,
        }
    }

    /// Write one sample at `offset`, mutating the buffer in place. The value
    /// must already be clamped to the valid range.
    pub fn write_sample(&self, buf: &mut [u8], value: i64, offset: usize) {
        match (self.bit_depth, self.endianness) {
            (BitDepth::Sixteen, Endianness::Little) => {
                buf[offset..offset + 2].copy_from_slice(&(value as i16).to_le_bytes());
            }
            (BitDepth::Sixteen, Endianness::Big) => {
                buf[offset..offset + 2].copy_from_slice(&(value as i16).to_be_bytes());
            }
            (BitDepth::ThirtyTwo, Endianness::Little) => {
                buf[offset..offset + 4].copy_from_slice(&(value as i32).to_le_bytes());
            }
            (BitDepth::ThirtyTwo, Endianness::Big) => {
                buf[offset..offset + 4].copy_from_slice(&(value as i32).to_be_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format_16_le() -> PcmFormat {
        PcmFormat::new(BitDepth::Sixteen, Endianness::Little, 48000, 2).unwrap()
    }

    #[test]
    fn test_rejects_invalid_geometry() {
        assert!(BitDepth::from_bits(24).is_err());
        assert!(PcmFormat::new(BitDepth::Sixteen, Endianness::Little, 0, 2).is_err());
        assert!(PcmFormat::new(BitDepth::Sixteen, Endianness::Little, 48000, 0).is_err());
    }

    #[test]
    fn test_geometry_arithmetic() {
        let format = format_16_le();
        assert_eq!(format.bytes_per_sample(), 2);
        assert_eq!(format.bytes_per_frame(), 4);
        assert_eq!(format.extremum(), 32768);

        let format = PcmFormat::new(BitDepth::ThirtyTwo, Endianness::Big, 44100, 1).unwrap();
        assert_eq!(format.bytes_per_sample(), 4);
        assert_eq!(format.bytes_per_frame(), 4);
        assert_eq!(format.extremum(), 2147483648);
    }

    #[test]
    fn test_codec_roundtrip_16_bit() {
        let le = format_16_le();
        let be = PcmFormat::new(BitDepth::Sixteen, Endianness::Big, 48000, 2).unwrap();
        let mut buf = vec![0u8; 4];

        for value in [-32768i64, -1, 0, 1, 32767] {
            le.write_sample(&mut buf, value, 2);
            assert_eq!(le.read_sample(&buf, 2), value);

            be.write_sample(&mut buf, value, 0);
            assert_eq!(be.read_sample(&buf, 0), value);
        }
    }

    #[test]
    fn test_codec_roundtrip_32_bit() {
        let le = PcmFormat::new(BitDepth::ThirtyTwo, Endianness::Little, 48000, 1).unwrap();
        let be = PcmFormat::new(BitDepth::ThirtyTwo, Endianness::Big, 48000, 1).unwrap();
        let mut buf = vec![0u8; 4];

        for value in [i32::MIN as i64, -1, 0, 1, i32::MAX as i64] {
            le.write_sample(&mut buf, value, 0);
            assert_eq!(le.read_sample(&buf, 0), value);

            be.write_sample(&mut buf, value, 0);
            assert_eq!(be.read_sample(&buf, 0), value);
        }
    }

    #[test]
    fn test_endianness_matters() {
        let le = format_16_le();
        let be = PcmFormat::new(BitDepth::Sixteen, Endianness::Big, 48000, 2).unwrap();
        let mut buf = vec![0u8; 2];
        le.write_sample(&mut buf, 0x1234, 0);
        assert_eq!(be.read_sample(&buf, 0), 0x3412);
    }

    #[test]
    fn test_clamp_to_valid_range() {
        let format = format_16_le();
        assert_eq!(format.clamp(40000), 32767);
        assert_eq!(format.clamp(-40000), -32768);
        assert_eq!(format.clamp(123), 123);
    }

    #[test]
    fn test_sample_rate_change() {
        let mut format = format_16_le();
        format.set_sample_rate(96000).unwrap();
        assert_eq!(format.sample_rate(), 96000);
        assert!(format.set_sample_rate(0).is_err());
    }
}
