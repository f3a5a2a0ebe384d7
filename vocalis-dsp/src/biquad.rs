//! Second-order IIR filter sections
//!
//! Coefficient formulas follow the RBJ Audio EQ Cookbook. Coefficients are
//! normalized by a0 before being stored, so the difference equation never
//! divides. Filter state is owned by the `BiquadFilter` instance and is
//! never shared across channels; coefficient changes apply to future
//! samples only.

use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::str::FromStr;

use crate::error::DspError;
use crate::frequency::Frequency;

/// Maximally flat (Butterworth) Q for callers that want a neutral default.
pub const BUTTERWORTH_Q: f64 = FRAC_1_SQRT_2;

/// Filter family, resolved once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterKind {
    #[default]
    LowPass,
    HighPass,
    BandPass,
    Notch,
    AllPass,
    Peaking,
    LowShelf,
    HighShelf,
    SinglePoleLowPass,
    SinglePoleLowPassApprox,
}

impl FilterKind {
    /// Name used in logs and events.
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::LowPass => "LowPass",
            FilterKind::HighPass => "HighPass",
            FilterKind::BandPass => "BandPass",
            FilterKind::Notch => "Notch",
            FilterKind::AllPass => "AllPass",
            FilterKind::Peaking => "PeakingEQ",
            FilterKind::LowShelf => "LowShelf",
            FilterKind::HighShelf => "HighShelf",
            FilterKind::SinglePoleLowPass => "SinglePoleLowPass",
            FilterKind::SinglePoleLowPassApprox => "SinglePoleLowPassApprox",
        }
    }
}

impl FromStr for FilterKind {
    type Err = DspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
            "lowpass" => Ok(FilterKind::LowPass),
            "highpass" => Ok(FilterKind::HighPass),
            "bandpass" => Ok(FilterKind::BandPass),
            "notch" => Ok(FilterKind::Notch),
            "allpass" => Ok(FilterKind::AllPass),
            "peaking" | "peakingeq" => Ok(FilterKind::Peaking),
            "lowshelf" => Ok(FilterKind::LowShelf),
            "highshelf" => Ok(FilterKind::HighShelf),
            "singlepolelowpass" => Ok(FilterKind::SinglePoleLowPass),
            "singlepolelowpassapprox" => Ok(FilterKind::SinglePoleLowPassApprox),
            _ => Err(DspError::UnknownFilterKind(s.to_string())),
        }
    }
}

/// Normalized biquad coefficients (a0 pre-divided out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Coefficients {
    /// Compute coefficients for a filter family. Pure function: rejects a
    /// non-finite or non-positive sample rate, requires Q > 0 and a finite
    /// gain. `gain_db` only affects the peaking and shelving families.
    pub fn from_params(
        kind: FilterKind,
        sample_rate: f64,
        frequency: Frequency,
        q: f64,
        gain_db: f64,
    ) -> Result<Self, DspError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        if !q.is_finite() || q <= 0.0 {
            return Err(DspError::InvalidQ(q));
        }
        if !gain_db.is_finite() {
            return Err(DspError::InvalidGain(gain_db));
        }

        let omega = 2.0 * PI * frequency.hertz() / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * q);
        // Amplitude for the peaking/shelving families
        let a = 10f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::LowPass => (
                (1.0 - cos_w) / 2.0,
                1.0 - cos_w,
                (1.0 - cos_w) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterKind::HighPass => (
                (1.0 + cos_w) / 2.0,
                -(1.0 + cos_w),
                (1.0 + cos_w) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            // Constant 0 dB peak gain variant
            FilterKind::BandPass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterKind::Notch => (
                1.0,
                -2.0 * cos_w,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterKind::AllPass => (
                1.0 - alpha,
                -2.0 * cos_w,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            FilterKind::Peaking => (
                1.0 + alpha * a,
                -2.0 * cos_w,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w,
                1.0 - alpha / a,
            ),
            FilterKind::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                    a * ((a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                    (a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha,
                )
            }
            FilterKind::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
                    a * ((a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
                    (a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha,
                )
            }
            FilterKind::SinglePoleLowPass => {
                let x = (-omega).exp();
                (1.0 - x, 0.0, 0.0, 1.0, -x, 0.0)
            }
            FilterKind::SinglePoleLowPassApprox => {
                let x = omega / (omega + 1.0);
                (x, 0.0, 0.0, 1.0, x - 1.0, 0.0)
            }
        };

        Ok(Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        })
    }
}

/// One biquad section with its own running state.
pub struct BiquadFilter {
    kind: FilterKind,
    sample_rate: f64,
    frequency: Frequency,
    q: f64,
    gain_db: f64,
    coefficients: Coefficients,
    enabled: bool,

    // Two prior inputs and outputs
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadFilter {
    /// Create a filter with freshly computed coefficients and zeroed state.
    pub fn new(
        kind: FilterKind,
        sample_rate: f64,
        frequency: Frequency,
        q: f64,
        gain_db: f64,
    ) -> Result<Self, DspError> {
        let coefficients = Coefficients::from_params(kind, sample_rate, frequency, q, gain_db)?;
        Ok(Self {
            kind,
            sample_rate,
            frequency,
            q,
            gain_db,
            coefficients,
            enabled: true,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        })
    }

    /// Apply the canonical difference equation to one sample and shift the
    /// state. Output is not clamped here; that is the transformer's job.
    /// Disabled filters pass the sample through without touching state.
    pub fn run(&mut self, x: f64) -> f64 {
        if !self.enabled {
            return x;
        }
        let c = &self.coefficients;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    /// Switch the filter family. State is kept; the new coefficients apply
    /// to future samples only.
    pub fn set_kind(&mut self, kind: FilterKind) -> Result<(), DspError> {
        self.coefficients =
            Coefficients::from_params(kind, self.sample_rate, self.frequency, self.q, self.gain_db)?;
        self.kind = kind;
        Ok(())
    }

    /// Retune the gain (peaking/shelving families).
    pub fn set_gain(&mut self, gain_db: f64) -> Result<(), DspError> {
        self.coefficients =
            Coefficients::from_params(self.kind, self.sample_rate, self.frequency, self.q, gain_db)?;
        self.gain_db = gain_db;
        Ok(())
    }

    /// Retune the center/cutoff frequency.
    pub fn set_frequency(&mut self, frequency: Frequency) -> Result<(), DspError> {
        self.coefficients =
            Coefficients::from_params(self.kind, self.sample_rate, frequency, self.q, self.gain_db)?;
        self.frequency = frequency;
        Ok(())
    }

    /// Retune the quality factor.
    pub fn set_q(&mut self, q: f64) -> Result<(), DspError> {
        self.coefficients =
            Coefficients::from_params(self.kind, self.sample_rate, self.frequency, q, self.gain_db)?;
        self.q = q;
        Ok(())
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    pub fn coefficients(&self) -> Coefficients {
        self.coefficients
    }
}
