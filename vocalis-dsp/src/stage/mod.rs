//! Processing stages for the PCM pipeline

mod compressor;
mod equalizer;
mod filter;
mod reverb;
mod seeker;
mod volume;

pub use compressor::{CompressorConfig, CompressorParams, CompressorStage};
pub use equalizer::{EqBand, EqPreset, EqualizerConfig, EqualizerStage, ISO_BANDS};
pub use filter::{BiquadConfig, FilterStage};
pub use reverb::{ReverbConfig, ReverbStage};
pub use seeker::SeekerStage;
pub use volume::{VolumeStage, MAX_VOLUME_PERCENT};

/// Trait for PCM byte-stream stages.
///
/// Stages process interleaved PCM in place, one chunk at a time, in arrival
/// order. A stage may change the chunk's length (the seeker does when
/// skipping), but must never buffer more than one frame of data between
/// chunks and must never reorder chunks.
pub trait PcmStage: Send {
    /// Process one chunk of interleaved PCM bytes in place.
    fn process(&mut self, chunk: &mut Vec<u8>);

    /// Emit any retained bytes at end of stream.
    fn flush(&mut self, _out: &mut Vec<u8>) {}

    /// Stage name for logs and events.
    fn name(&self) -> &'static str;
}
