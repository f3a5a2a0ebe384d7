//! Error types for the DSP core

use thiserror::Error;

/// Errors raised at configuration time.
///
/// Steady-state `process` calls never fail: numeric edge cases are handled
/// by clamping inside each stage. Only stage construction and setter calls
/// return these.
#[derive(Debug, Error)]
pub enum DspError {
    #[error("unsupported bit depth: {0} (supported: 16, 32)")]
    UnsupportedBitDepth(u32),

    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("channel count must be positive, got {0}")]
    InvalidChannelCount(u32),

    #[error("frequency must be finite and non-negative, got {0}")]
    InvalidFrequency(f64),

    #[error("Q must be positive and finite, got {0}")]
    InvalidQ(f64),

    #[error("gain must be finite, got {0} dB")]
    InvalidGain(f64),

    #[error("unknown filter type: {0:?}")]
    UnknownFilterKind(String),

    #[error("volume must be a non-negative number, got {0}")]
    InvalidVolume(f64),

    #[error("total duration must be positive, got {0} ms")]
    InvalidDuration(u64),

    #[error("stage not configured: {0}")]
    StageNotConfigured(&'static str),
}
