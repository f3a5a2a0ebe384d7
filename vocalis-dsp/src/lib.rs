//! Real-time PCM signal processing for the Vocalis voice-streaming engine
//!
//! A composable pipeline of byte-stream transforms that sits between a
//! decoded PCM source and the outbound encoder:
//! - Equalizer: cascaded peaking filters per channel with named presets
//! - Compressor: soft-knee dynamic-range compression
//! - Reverb: feedback delay-network reverberation
//! - Biquad: a single configurable IIR filter section
//! - Volume: linear gain with a percent knob
//! - Seeker: sample-accurate stream seeking without decoding
//!
//! Stages are independently optional; a `FilterChain` instantiates only the
//! configured ones and wires them all to a shared event notifier. Processing
//! is single-threaded and push-based: one chunk at a time, in arrival order.

mod biquad;
mod chain;
mod error;
mod events;
mod frequency;
mod pcm;
mod stage;

pub use biquad::{BiquadFilter, Coefficients, FilterKind, BUTTERWORTH_Q};
pub use chain::{ChainConfig, DspFilterConfig, FilterChain, SeekConfig};
pub use error::DspError;
pub use events::{ChainEvent, Notifier};
pub use frequency::Frequency;
pub use pcm::{BitDepth, Endianness, PcmFormat};
pub use stage::{
    BiquadConfig, CompressorConfig, CompressorParams, CompressorStage, EqBand, EqPreset,
    EqualizerConfig, EqualizerStage, FilterStage, PcmStage, ReverbConfig, ReverbStage,
    SeekerStage, VolumeStage, ISO_BANDS, MAX_VOLUME_PERCENT,
};
