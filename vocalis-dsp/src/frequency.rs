//! Scalar frequency value with unit normalization

use std::fmt;

use crate::error::DspError;

/// A validated frequency, stored internally in hertz.
///
/// Constructed from Hz, kHz, MHz or a period in seconds. Always finite and
/// non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Frequency(f64);

impl Frequency {
    /// Create from a value in hertz.
    pub fn from_hertz(hz: f64) -> Result<Self, DspError> {
        if !hz.is_finite() || hz < 0.0 {
            return Err(DspError::InvalidFrequency(hz));
        }
        Ok(Self(hz))
    }

    /// Create from a value in kilohertz.
    pub fn from_kilohertz(khz: f64) -> Result<Self, DspError> {
        Self::from_hertz(khz * 1e3)
    }

    /// Create from a value in megahertz.
    pub fn from_megahertz(mhz: f64) -> Result<Self, DspError> {
        Self::from_hertz(mhz * 1e6)
    }

    /// Create from a period in seconds. The period must be finite and positive.
    pub fn from_period(seconds: f64) -> Result<Self, DspError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(DspError::InvalidFrequency(seconds));
        }
        Self::from_hertz(1.0 / seconds)
    }

    /// Value in hertz.
    pub fn hertz(&self) -> f64 {
        self.0
    }

    /// Value in kilohertz.
    pub fn kilohertz(&self) -> f64 {
        self.0 / 1e3
    }

    /// Value in megahertz.
    pub fn megahertz(&self) -> f64 {
        self.0 / 1e6
    }

    /// Period in seconds. Zero frequency yields infinity.
    pub fn period(&self) -> f64 {
        1.0 / self.0
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_normalization() {
        let freq = Frequency::from_kilohertz(1.5).unwrap();
        assert!((freq.hertz() - 1500.0).abs() < 1e-9);
        assert!((freq.kilohertz() - 1.5).abs() < 1e-9);

        let freq = Frequency::from_megahertz(0.002).unwrap();
        assert!((freq.hertz() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_period_roundtrip() {
        let freq = Frequency::from_period(0.02).unwrap();
        assert!((freq.hertz() - 50.0).abs() < 1e-9);
        assert!((freq.period() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert!(Frequency::from_hertz(-1.0).is_err());
        assert!(Frequency::from_hertz(f64::NAN).is_err());
        assert!(Frequency::from_hertz(f64::INFINITY).is_err());
        assert!(Frequency::from_period(0.0).is_err());
        assert!(Frequency::from_period(-0.5).is_err());
    }

    #[test]
    fn test_zero_frequency_is_valid() {
        let freq = Frequency::from_hertz(0.0).unwrap();
        assert_eq!(freq.hertz(), 0.0);
        assert!(freq.period().is_infinite());
    }

    #[test]
    fn test_display() {
        let freq = Frequency::from_hertz(440.0).unwrap();
        assert_eq!(freq.to_string(), "440 Hz");
    }
}
