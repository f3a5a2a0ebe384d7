//! Multi-band equalizer
//!
//! One cascade of peaking biquads per channel. Bands are applied serially
//! in the order given (cascaded, not summed); each channel owns its own
//! filter state.

use super::PcmStage;
use crate::biquad::{BiquadFilter, FilterKind};
use crate::error::DspError;
use crate::events::Notifier;
use crate::frequency::Frequency;
use crate::pcm::PcmFormat;

/// ISO octave band centers used by the named presets.
pub const ISO_BANDS: [f64; 10] = [
    31.25, 62.5, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Default Q for a graphic-EQ peaking band.
const DEFAULT_BAND_Q: f64 = 1.0;

/// One equalizer band: center frequency, gain and bandwidth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqBand {
    /// Center frequency in Hz.
    pub frequency: f64,
    /// Boost/cut in dB.
    pub gain_db: f64,
    /// Quality factor.
    pub q: f64,
}

impl EqBand {
    pub fn new(frequency: f64, gain_db: f64) -> Self {
        Self {
            frequency,
            gain_db,
            q: DEFAULT_BAND_Q,
        }
    }
}

/// Named band-gain presets over `ISO_BANDS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqPreset {
    Flat,
    Bass,
    Treble,
    Rock,
    Pop,
    Jazz,
    Classical,
}

impl EqPreset {
    /// Band gains in dB, low to high.
    pub fn bands(&self) -> Vec<EqBand> {
        let gains: [f64; 10] = match self {
            EqPreset::Flat => [0.0; 10],
            EqPreset::Bass => [6.0, 5.0, 4.0, 2.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            EqPreset::Treble => [0.0, 0.0, 0.0, 0.0, 0.0, 1.5, 3.0, 4.5, 6.0, 6.0],
            EqPreset::Rock => [5.0, 4.0, 3.0, 1.0, -1.0, -1.0, 1.0, 3.0, 4.0, 5.0],
            EqPreset::Pop => [-1.5, -1.0, 0.0, 2.0, 4.0, 4.0, 2.0, 0.0, -1.0, -1.5],
            EqPreset::Jazz => [3.0, 2.0, 1.0, 2.0, -2.0, -2.0, 0.0, 1.0, 2.0, 3.0],
            EqPreset::Classical => [4.5, 3.5, 3.0, 2.5, -1.5, -1.5, 0.0, 2.0, 3.0, 3.5],
        };
        ISO_BANDS
            .iter()
            .zip(gains)
            .map(|(&freq, gain)| EqBand::new(freq, gain))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            EqPreset::Flat => "Flat",
            EqPreset::Bass => "Bass",
            EqPreset::Treble => "Treble",
            EqPreset::Rock => "Rock",
            EqPreset::Pop => "Pop",
            EqPreset::Jazz => "Jazz",
            EqPreset::Classical => "Classical",
        }
    }
}

/// Equalizer configuration: a named preset or an explicit band list.
#[derive(Debug, Clone)]
pub enum EqualizerConfig {
    Preset(EqPreset),
    Bands(Vec<EqBand>),
}

impl EqualizerConfig {
    pub fn bands(&self) -> Vec<EqBand> {
        match self {
            EqualizerConfig::Preset(preset) => preset.bands(),
            EqualizerConfig::Bands(bands) => bands.clone(),
        }
    }
}

/// Cascaded peaking-filter bank, one chain per channel.
pub struct EqualizerStage {
    format: PcmFormat,
    bands: Vec<EqBand>,
    // Indexed [channel][band]
    filters: Vec<Vec<BiquadFilter>>,
    enabled: bool,
    notifier: Notifier,
}

impl EqualizerStage {
    pub fn new(format: PcmFormat, bands: Vec<EqBand>) -> Result<Self, DspError> {
        let filters = Self::build_filters(&format, &bands)?;
        Ok(Self {
            format,
            bands,
            filters,
            enabled: true,
            notifier: Notifier::disconnected(),
        })
    }

    fn build_filters(
        format: &PcmFormat,
        bands: &[EqBand],
    ) -> Result<Vec<Vec<BiquadFilter>>, DspError> {
        (0..format.channels())
            .map(|_| {
                bands
                    .iter()
                    .map(|band| {
                        BiquadFilter::new(
                            FilterKind::Peaking,
                            format.sample_rate() as f64,
                            Frequency::from_hertz(band.frequency)?,
                            band.q,
                            band.gain_db,
                        )
                    })
                    .collect()
            })
            .collect()
    }

    /// Replace the band configuration. When the layout (frequencies and Qs)
    /// is unchanged only the gains are retuned, keeping filter state;
    /// otherwise the cascade is rebuilt. Buffered audio is never dropped.
    pub fn set_bands(&mut self, bands: Vec<EqBand>) -> Result<(), DspError> {
        for band in &bands {
            if !band.gain_db.is_finite() {
                return Err(DspError::InvalidGain(band.gain_db));
            }
        }
        let same_layout = bands.len() == self.bands.len()
            && bands
                .iter()
                .zip(&self.bands)
                .all(|(new, old)| new.frequency == old.frequency && new.q == old.q);

        if same_layout {
            for chain in &mut self.filters {
                for (filter, band) in chain.iter_mut().zip(&bands) {
                    filter.set_gain(band.gain_db)?;
                }
            }
        } else {
            self.filters = Self::build_filters(&self.format, &bands)?;
        }
        self.bands = bands;
        self.notifier.reconfigured("equalizer");
        Ok(())
    }

    /// Apply a named preset.
    pub fn set_preset(&mut self, preset: EqPreset) -> Result<(), DspError> {
        self.set_bands(preset.bands())
    }

    /// Gate whether the whole multi-band chain is applied.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.notifier.reconfigured("equalizer");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn bands(&self) -> &[EqBand] {
        &self.bands
    }

    pub(crate) fn set_notifier(&mut self, notifier: Notifier) {
        self.notifier = notifier;
    }
}

impl PcmStage for EqualizerStage {
    fn process(&mut self, chunk: &mut Vec<u8>) {
        if !self.enabled || self.bands.is_empty() {
            return;
        }
        let bytes = self.format.bytes_per_sample();
        let frame = self.format.bytes_per_frame();
        let whole = chunk.len() / frame * frame;
        let mut offset = 0;
        while offset < whole {
            for (channel, filters) in self.filters.iter_mut().enumerate() {
                let pos = offset + channel * bytes;
                let mut sample = self.format.read_sample(chunk, pos) as f64;
                for filter in filters.iter_mut() {
                    sample = filter.run(sample);
                }
                self.format
                    .write_sample(chunk, self.format.clamp(sample.round() as i64), pos);
            }
            offset += frame;
        }
    }

    fn name(&self) -> &'static str {
        "equalizer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::{BitDepth, Endianness};

    fn format() -> PcmFormat {
        PcmFormat::new(BitDepth::Sixteen, Endianness::Little, 48000, 2).unwrap()
    }

    fn encode(format: &PcmFormat, samples: &[i64]) -> Vec<u8> {
        let mut buf = vec![0u8; samples.len() * format.bytes_per_sample()];
        for (i, &s) in samples.iter().enumerate() {
            format.write_sample(&mut buf, s, i * format.bytes_per_sample());
        }
        buf
    }

    fn sine_chunk(format: &PcmFormat, hz: f64, frames: usize, amplitude: f64) -> Vec<u8> {
        let rate = format.sample_rate() as f64;
        let samples: Vec<i64> = (0..frames)
            .flat_map(|i| {
                let value =
                    (amplitude * (2.0 * std::f64::consts::PI * hz * i as f64 / rate).sin()) as i64;
                [value, value]
            })
            .collect();
        encode(format, &samples)
    }

    #[test]
    fn test_flat_preset_is_identity() {
        let format = format();
        let mut eq = EqualizerStage::new(format, EqPreset::Flat.bands()).unwrap();
        let mut chunk = sine_chunk(&format, 440.0, 256, 20000.0);
        let original = chunk.clone();
        eq.process(&mut chunk);
        assert_eq!(chunk, original);
    }

    #[test]
    fn test_bass_preset_boosts_low_frequencies() {
        let format = format();
        let mut eq = EqualizerStage::new(format, EqPreset::Bass.bands()).unwrap();
        let mut chunk = sine_chunk(&format, 62.5, 4800, 8000.0);
        let original = chunk.clone();
        eq.process(&mut chunk);
        assert_ne!(chunk, original);

        // Peak amplitude of the steady-state tail must be boosted.
        let tail = 4800 * 2 / 2;
        let mut peak = 0i64;
        for i in tail..4800 * 2 {
            peak = peak.max(format.read_sample(&chunk, i * 2).abs());
        }
        assert!(peak > 9000, "expected boost above 8000, got {peak}");
    }

    #[test]
    fn test_output_stays_in_valid_range() {
        let format = format();
        let mut eq = EqualizerStage::new(format, EqPreset::Bass.bands()).unwrap();
        let mut chunk = sine_chunk(&format, 62.5, 4800, 32000.0);
        eq.process(&mut chunk);
        for i in 0..4800 * 2 {
            let s = format.read_sample(&chunk, i * 2);
            assert!((-32768..=32767).contains(&s));
        }
    }

    #[test]
    fn test_gain_only_retune_keeps_layout() {
        let format = format();
        let mut eq = EqualizerStage::new(format, EqPreset::Flat.bands()).unwrap();
        let mut retuned = EqPreset::Flat.bands();
        retuned[0].gain_db = 6.0;
        eq.set_bands(retuned.clone()).unwrap();
        assert_eq!(eq.bands(), retuned.as_slice());
    }

    #[test]
    fn test_invalid_band_is_rejected() {
        let format = format();
        let mut eq = EqualizerStage::new(format, EqPreset::Flat.bands()).unwrap();
        assert!(eq.set_bands(vec![EqBand::new(-100.0, 0.0)]).is_err());
        assert!(eq
            .set_bands(vec![EqBand {
                frequency: 1000.0,
                gain_db: f64::NAN,
                q: 1.0
            }])
            .is_err());
        // Failed retune keeps the previous configuration.
        assert_eq!(eq.bands().len(), 10);
    }

    #[test]
    fn test_disabled_is_passthrough() {
        let format = format();
        let mut eq = EqualizerStage::new(format, EqPreset::Rock.bands()).unwrap();
        eq.set_enabled(false);
        let mut chunk = sine_chunk(&format, 440.0, 128, 20000.0);
        let original = chunk.clone();
        eq.process(&mut chunk);
        assert_eq!(chunk, original);
    }
}
