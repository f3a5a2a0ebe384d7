//! Dynamic-range compressor
//!
//! One-pole envelope follower driving a soft-knee gain computer, applied to
//! the decoded integer amplitude normalized to [-1, 1]. Gain reduction is
//! smoothed with the attack coefficient in both directions: relaxation is
//! intentionally no faster than attack. This asymmetry is specified
//! behavior, not an oversight.

use super::PcmStage;
use crate::events::Notifier;
use crate::pcm::PcmFormat;

/// Full parameter snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    /// Threshold in dB, clamped to [-100, 0].
    pub threshold_db: f64,
    /// Compression ratio, at least 1.
    pub ratio: f64,
    /// Attack time in milliseconds.
    pub attack_ms: f64,
    /// Release time in milliseconds.
    pub release_ms: f64,
    /// Makeup gain in dB, clamped to [-20, 20].
    pub makeup_db: f64,
    /// Knee width in dB, clamped to [0, 20].
    pub knee_db: f64,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            ratio: 4.0,
            attack_ms: 10.0,
            release_ms: 150.0,
            makeup_db: 0.0,
            knee_db: 6.0,
        }
    }
}

/// Partial parameter update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressorConfig {
    pub threshold_db: Option<f64>,
    pub ratio: Option<f64>,
    pub attack_ms: Option<f64>,
    pub release_ms: Option<f64>,
    pub makeup_db: Option<f64>,
    pub knee_db: Option<f64>,
}

/// Minimum attack/release time; keeps the smoothing coefficient finite.
const MIN_TIME_MS: f64 = 0.01;

pub struct CompressorStage {
    format: PcmFormat,
    params: CompressorParams,

    // One-pole smoothing coefficients derived from attack/release times
    attack_coeff: f64,
    release_coeff: f64,

    // Envelope level in [0, 1] and previous gain reduction in dB
    envelope: f64,
    gain_reduction_db: f64,

    notifier: Notifier,
}

impl CompressorStage {
    pub fn new(format: PcmFormat) -> Self {
        let mut stage = Self {
            format,
            params: CompressorParams::default(),
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
            gain_reduction_db: 0.0,
            notifier: Notifier::disconnected(),
        };
        stage.update_coefficients();
        stage
    }

    /// Set the threshold in dB; stored value is clamped to [-100, 0].
    pub fn set_threshold(&mut self, db: f64) {
        if db.is_nan() {
            return;
        }
        self.params.threshold_db = db.clamp(-100.0, 0.0);
        self.notify();
    }

    /// Set the compression ratio; stored value is at least 1.
    pub fn set_ratio(&mut self, ratio: f64) {
        if ratio.is_nan() {
            return;
        }
        self.params.ratio = ratio.max(1.0);
        self.notify();
    }

    /// Set the attack time in milliseconds.
    pub fn set_attack(&mut self, ms: f64) {
        if ms.is_nan() {
            return;
        }
        self.params.attack_ms = ms.max(MIN_TIME_MS);
        self.update_coefficients();
        self.notify();
    }

    /// Set the release time in milliseconds.
    pub fn set_release(&mut self, ms: f64) {
        if ms.is_nan() {
            return;
        }
        self.params.release_ms = ms.max(MIN_TIME_MS);
        self.update_coefficients();
        self.notify();
    }

    /// Set the makeup gain in dB; stored value is clamped to [-20, 20].
    pub fn set_makeup_gain(&mut self, db: f64) {
        if db.is_nan() {
            return;
        }
        self.params.makeup_db = db.clamp(-20.0, 20.0);
        self.notify();
    }

    /// Set the knee width in dB; stored value is clamped to [0, 20].
    pub fn set_knee_width(&mut self, db: f64) {
        if db.is_nan() {
            return;
        }
        self.params.knee_db = db.clamp(0.0, 20.0);
        self.notify();
    }

    /// Apply a partial update; fields left `None` keep their current value.
    /// A single reconfiguration event is emitted.
    pub fn set_params(&mut self, config: &CompressorConfig) {
        if let Some(db) = config.threshold_db {
            if !db.is_nan() {
                self.params.threshold_db = db.clamp(-100.0, 0.0);
            }
        }
        if let Some(ratio) = config.ratio {
            if !ratio.is_nan() {
                self.params.ratio = ratio.max(1.0);
            }
        }
        if let Some(ms) = config.attack_ms {
            if !ms.is_nan() {
                self.params.attack_ms = ms.max(MIN_TIME_MS);
            }
        }
        if let Some(ms) = config.release_ms {
            if !ms.is_nan() {
                self.params.release_ms = ms.max(MIN_TIME_MS);
            }
        }
        if let Some(db) = config.makeup_db {
            if !db.is_nan() {
                self.params.makeup_db = db.clamp(-20.0, 20.0);
            }
        }
        if let Some(db) = config.knee_db {
            if !db.is_nan() {
                self.params.knee_db = db.clamp(0.0, 20.0);
            }
        }
        self.update_coefficients();
        self.notify();
    }

    /// Current parameter snapshot.
    pub fn params(&self) -> CompressorParams {
        self.params
    }

    /// Current gain reduction in dB, for metering.
    pub fn gain_reduction_db(&self) -> f64 {
        self.gain_reduction_db
    }

    pub(crate) fn set_notifier(&mut self, notifier: Notifier) {
        self.notifier = notifier;
    }

    fn notify(&self) {
        self.notifier.reconfigured("compressor");
    }

    fn update_coefficients(&mut self) {
        let rate = self.format.sample_rate() as f64;
        self.attack_coeff = (-1.0 / (rate * self.params.attack_ms / 1000.0)).exp();
        self.release_coeff = (-1.0 / (rate * self.params.release_ms / 1000.0)).exp();
    }

    /// Target gain reduction (positive dB) for the given input level.
    fn target_reduction_db(&self, input_db: f64) -> f64 {
        let threshold = self.params.threshold_db;
        let knee = self.params.knee_db;
        let slope = 1.0 - 1.0 / self.params.ratio;

        if input_db < threshold - knee / 2.0 {
            0.0
        } else if knee > 0.0 && input_db <= threshold + knee / 2.0 {
            // Quadratic interpolation across the knee
            let x = input_db - threshold + knee / 2.0;
            slope * x * x / (2.0 * knee)
        } else {
            slope * (input_db - threshold)
        }
    }
}

#[inline]
fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

impl PcmStage for CompressorStage {
    fn process(&mut self, chunk: &mut Vec<u8>) {
        let bytes = self.format.bytes_per_sample();
        let extremum = self.format.extremum() as f64;
        let mut offset = 0;
        while offset + bytes <= chunk.len() {
            let input = self.format.read_sample(chunk, offset) as f64 / extremum;
            let level = input.abs();

            // Attack when the signal rises above the envelope, release when
            // it falls below.
            let coeff = if level > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

            let input_db = if self.envelope > 1e-10 {
                20.0 * self.envelope.log10()
            } else {
                -100.0
            };
            let target_db = self.target_reduction_db(input_db);

            // Reduction moves only as fast as attack allows, both ways.
            self.gain_reduction_db = self.attack_coeff * self.gain_reduction_db
                + (1.0 - self.attack_coeff) * target_db;

            let gain = db_to_linear(-self.gain_reduction_db + self.params.makeup_db);
            let output = (input * gain * extremum).round() as i64;
            self.format
                .write_sample(chunk, self.format.clamp(output), offset);
            offset += bytes;
        }
    }

    fn name(&self) -> &'static str {
        "compressor"
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

    fn decode(format: &PcmFormat, buf: &[u8]) -> Vec<i64> {
        (0..buf.len() / format.bytes_per_sample())
            .map(|i| format.read_sample(buf, i * format.bytes_per_sample()))
            .collect()
    }

    #[test]
    fn test_threshold_always_in_range() {
        let mut comp = CompressorStage::new(format());
        comp.set_threshold(-500.0);
        assert_eq!(comp.params().threshold_db, -100.0);
        comp.set_threshold(25.0);
        assert_eq!(comp.params().threshold_db, 0.0);
        comp.set_threshold(-10.0);
        assert_eq!(comp.params().threshold_db, -10.0);
    }

    #[test]
    fn test_partial_update_leaves_other_fields_alone() {
        let mut comp = CompressorStage::new(format());
        let before = comp.params();
        comp.set_params(&CompressorConfig {
            threshold_db: Some(-10.0),
            ratio: Some(4.0),
            ..Default::default()
        });
        let after = comp.params();
        assert_eq!(after.threshold_db, -10.0);
        assert_eq!(after.ratio, 4.0);
        assert_eq!(after.attack_ms, before.attack_ms);
        assert_eq!(after.release_ms, before.release_ms);
        assert_eq!(after.makeup_db, before.makeup_db);
        assert_eq!(after.knee_db, before.knee_db);
    }

    #[test]
    fn test_parameter_clamping() {
        let mut comp = CompressorStage::new(format());
        comp.set_ratio(0.5);
        assert_eq!(comp.params().ratio, 1.0);
        comp.set_makeup_gain(100.0);
        assert_eq!(comp.params().makeup_db, 20.0);
        comp.set_knee_width(-3.0);
        assert_eq!(comp.params().knee_db, 0.0);
        comp.set_knee_width(50.0);
        assert_eq!(comp.params().knee_db, 20.0);
    }

    #[test]
    fn test_quiet_signal_passes_unchanged() {
        // -50 dBFS sits well below threshold - knee/2; gain stays at unity.
        let format = format();
        let mut comp = CompressorStage::new(format);
        let samples = vec![100i64; 256];
        let mut chunk = encode(&format, &samples);
        comp.process(&mut chunk);
        assert_eq!(decode(&format, &chunk), samples);
    }

    #[test]
    fn test_loud_signal_is_attenuated() {
        let format = format();
        let mut comp = CompressorStage::new(format);
        comp.set_threshold(-24.0);
        comp.set_ratio(4.0);

        // Sustained near-full-scale signal; let envelope and reduction settle.
        let samples = vec![30000i64; 48000];
        let mut chunk = encode(&format, &samples);
        comp.process(&mut chunk);
        let out = decode(&format, &chunk);
        let last = *out.last().unwrap();
        assert!(last < 15000, "expected attenuation, got {last}");
        assert!(comp.gain_reduction_db() > 1.0);
    }

    #[test]
    fn test_output_stays_in_valid_range() {
        let format = format();
        let mut comp = CompressorStage::new(format);
        comp.set_makeup_gain(20.0);
        let samples: Vec<i64> = (0..4096)
            .map(|i| if i % 2 == 0 { 32767 } else { -32768 })
            .collect();
        let mut chunk = encode(&format, &samples);
        comp.process(&mut chunk);
        for s in decode(&format, &chunk) {
            assert!((-32768..=32767).contains(&s));
        }
    }

    #[test]
    fn test_nan_setter_input_is_ignored() {
        let mut comp = CompressorStage::new(format());
        let before = comp.params();
        comp.set_threshold(f64::NAN);
        comp.set_ratio(f64::NAN);
        assert_eq!(comp.params(), before);
    }
}
