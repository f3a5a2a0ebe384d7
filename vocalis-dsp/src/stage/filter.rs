//! Single biquad filter stage
//!
//! Applies one configurable IIR section per channel over the byte stream.
//! The filter family is resolved once at construction; live retuning swaps
//! coefficients without reallocating state.

use super::PcmStage;
use crate::biquad::{BiquadFilter, FilterKind, BUTTERWORTH_Q};
use crate::error::DspError;
use crate::events::Notifier;
use crate::frequency::Frequency;
use crate::pcm::PcmFormat;

/// Configuration for the standalone biquad stage.
#[derive(Debug, Clone, Copy)]
pub struct BiquadConfig {
    pub kind: FilterKind,
    pub frequency: Frequency,
    pub q: f64,
    pub gain_db: f64,
}

impl BiquadConfig {
    /// A filter of the given family at `frequency` with Butterworth Q and
    /// no gain.
    pub fn new(kind: FilterKind, frequency: Frequency) -> Self {
        Self {
            kind,
            frequency,
            q: BUTTERWORTH_Q,
            gain_db: 0.0,
        }
    }
}

pub struct FilterStage {
    format: PcmFormat,
    // One filter per channel; state is never shared.
    filters: Vec<BiquadFilter>,
    notifier: Notifier,
}

impl FilterStage {
    pub fn new(format: PcmFormat, config: &BiquadConfig) -> Result<Self, DspError> {
        let filters = (0..format.channels())
            .map(|_| {
                BiquadFilter::new(
                    config.kind,
                    format.sample_rate() as f64,
                    config.frequency,
                    config.q,
                    config.gain_db,
                )
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            format,
            filters,
            notifier: Notifier::disconnected(),
        })
    }

    /// Switch the filter family, keeping per-channel state.
    pub fn set_kind(&mut self, kind: FilterKind) -> Result<(), DspError> {
        for filter in &mut self.filters {
            filter.set_kind(kind)?;
        }
        self.notify();
        Ok(())
    }

    /// Retune the center/cutoff frequency.
    pub fn set_frequency(&mut self, frequency: Frequency) -> Result<(), DspError> {
        for filter in &mut self.filters {
            filter.set_frequency(frequency)?;
        }
        self.notify();
        Ok(())
    }

    /// Retune the quality factor.
    pub fn set_q(&mut self, q: f64) -> Result<(), DspError> {
        for filter in &mut self.filters {
            filter.set_q(q)?;
        }
        self.notify();
        Ok(())
    }

    /// Retune the gain (peaking/shelving families).
    pub fn set_gain(&mut self, gain_db: f64) -> Result<(), DspError> {
        for filter in &mut self.filters {
            filter.set_gain(gain_db)?;
        }
        self.notify();
        Ok(())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        for filter in &mut self.filters {
            if enabled {
                filter.enable();
            } else {
                filter.disable();
            }
        }
        self.notify();
    }

    pub fn is_enabled(&self) -> bool {
        self.filters.iter().all(|f| f.is_enabled())
    }

    pub fn kind(&self) -> FilterKind {
        self.filters.first().map(|f| f.kind()).unwrap_or_default()
    }

    pub(crate) fn set_notifier(&mut self, notifier: Notifier) {
        self.notifier = notifier;
    }

    fn notify(&self) {
        self.notifier.reconfigured("biquad");
    }
}

impl PcmStage for FilterStage {
    fn process(&mut self, chunk: &mut Vec<u8>) {
        let bytes = self.format.bytes_per_sample();
        let frame = self.format.bytes_per_frame();
        let whole = chunk.len() / frame * frame;
        let mut offset = 0;
        while offset < whole {
            for (channel, filter) in self.filters.iter_mut().enumerate() {
                let pos = offset + channel * bytes;
                let sample = self.format.read_sample(chunk, pos) as f64;
                let filtered = filter.run(sample);
                self.format
                    .write_sample(chunk, self.format.clamp(filtered.round() as i64), pos);
            }
            offset += frame;
        }
    }

    fn name(&self) -> &'static str {
        "biquad"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::{BitDepth, Endianness};

    fn format() -> PcmFormat {
        PcmFormat::new(BitDepth::Sixteen, Endianness::Little, 48000, 2).unwrap()
    }

    fn config(kind: FilterKind) -> BiquadConfig {
        BiquadConfig::new(kind, Frequency::from_hertz(1000.0).unwrap())
    }

    fn alternating_chunk(format: &PcmFormat, frames: usize) -> Vec<u8> {
        let mut buf = vec![0u8; frames * format.bytes_per_frame()];
        for i in 0..frames * 2 {
            let value = if (i / 2) % 2 == 0 { 30000 } else { -30000 };
            format.write_sample(&mut buf, value, i * 2);
        }
        buf
    }

    #[test]
    fn test_every_kind_has_an_effect_and_stays_in_range() {
        let format = format();
        let kinds = [
            FilterKind::LowPass,
            FilterKind::HighPass,
            FilterKind::BandPass,
            FilterKind::Notch,
            FilterKind::AllPass,
            FilterKind::Peaking,
            FilterKind::LowShelf,
            FilterKind::HighShelf,
            FilterKind::SinglePoleLowPass,
            FilterKind::SinglePoleLowPassApprox,
        ];
        for kind in kinds {
            let mut cfg = config(kind);
            cfg.gain_db = 6.0;
            let mut stage = FilterStage::new(format, &cfg).unwrap();
            let mut chunk = alternating_chunk(&format, 256);
            let original = chunk.clone();
            stage.process(&mut chunk);
            assert_ne!(chunk, original, "{kind:?} had no effect");
            for i in 0..256 * 2 {
                let s = format.read_sample(&chunk, i * 2);
                assert!((-32768..=32767).contains(&s), "{kind:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn test_channels_are_filtered_independently() {
        let format = format();
        let mut stage = FilterStage::new(format, &config(FilterKind::LowPass)).unwrap();

        // Left carries signal, right stays silent; the silent channel must
        // remain exactly zero.
        let mut chunk = vec![0u8; 128 * format.bytes_per_frame()];
        for i in 0..128 {
            let value = if i % 2 == 0 { 20000 } else { -20000 };
            format.write_sample(&mut chunk, value, i * 4);
        }
        stage.process(&mut chunk);
        for i in 0..128 {
            assert_eq!(format.read_sample(&chunk, i * 4 + 2), 0);
        }
    }

    #[test]
    fn test_live_retune() {
        let format = format();
        let mut stage = FilterStage::new(format, &config(FilterKind::LowPass)).unwrap();
        stage.set_kind(FilterKind::HighPass).unwrap();
        assert_eq!(stage.kind(), FilterKind::HighPass);
        stage.set_frequency(Frequency::from_hertz(2000.0).unwrap()).unwrap();
        stage.set_q(2.0).unwrap();
        assert!(stage.set_q(-1.0).is_err());
    }

    #[test]
    fn test_disabled_is_passthrough() {
        let format = format();
        let mut stage = FilterStage::new(format, &config(FilterKind::LowPass)).unwrap();
        stage.set_enabled(false);
        let mut chunk = alternating_chunk(&format, 64);
        let original = chunk.clone();
        stage.process(&mut chunk);
        assert_eq!(chunk, original);
    }
}
