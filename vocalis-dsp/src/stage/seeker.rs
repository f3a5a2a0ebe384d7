//! Sample-accurate stream seeking
//!
//! Keeps a running cursor of interleaved samples over the byte stream and
//! resolves seek targets at frame boundaries without decoding. Forward
//! targets are reached by discarding whole chunks (or slicing the chunk the
//! target falls in); backward targets reset the cursor and tell consumers
//! to resynchronize, since the surrounding engine restarts byte delivery.

use tracing::debug;

use super::PcmStage;
use crate::error::DspError;
use crate::events::Notifier;
use crate::pcm::PcmFormat;

pub struct SeekerStage {
    format: PcmFormat,
    total_duration_ms: u64,
    /// Interleaved samples consumed so far.
    position_samples: u64,
    /// Forward target, resolved exactly once at the first chunk whose
    /// sample range covers it.
    pending_target: Option<u64>,
    /// Sub-frame remainder from the previous chunk; always < one frame.
    leftover: Vec<u8>,
    notifier: Notifier,
}

impl SeekerStage {
    /// Create a seeker over a stream of known duration.
    pub fn new(format: PcmFormat, total_duration_ms: u64) -> Result<Self, DspError> {
        if total_duration_ms == 0 {
            return Err(DspError::InvalidDuration(total_duration_ms));
        }
        Ok(Self {
            format,
            total_duration_ms,
            position_samples: 0,
            pending_target: None,
            leftover: Vec::new(),
            notifier: Notifier::disconnected(),
        })
    }

    /// Update the known stream duration. Zero marks it unknown, which makes
    /// seeking a no-op until a real duration arrives.
    pub fn set_total_duration(&mut self, ms: u64) {
        self.total_duration_ms = ms;
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    /// Current cursor in interleaved samples.
    pub fn position_samples(&self) -> u64 {
        self.position_samples
    }

    /// Current cursor in milliseconds.
    pub fn position_ms(&self) -> u64 {
        let frames = self.position_samples / self.format.channels() as u64;
        frames * 1000 / self.format.sample_rate() as u64
    }

    /// Seek to `ms`; negative values are measured from the end of the
    /// stream. The result is clamped to `[0, total]`. Returns the resolved
    /// position in milliseconds. Seeking to the current position is
    /// idempotent: no discontinuity is emitted.
    pub fn seek(&mut self, ms: i64) -> Result<u64, DspError> {
        if self.total_duration_ms == 0 {
            // Unknown duration; nothing to seek against.
            return Ok(self.position_ms());
        }
        let total = self.total_duration_ms as i64;
        let resolved = if ms < 0 { total + ms } else { ms }.clamp(0, total) as u64;
        let target = self.ms_to_samples(resolved);

        let already_there = match self.pending_target {
            Some(pending) => pending == target,
            None => target == self.position_samples,
        };
        if already_there {
            return Ok(resolved);
        }

        if target >= self.position_samples {
            self.pending_target = Some(target);
        } else {
            // Backward: the engine restarts delivery from the target, so
            // drop the partial frame and reset the cursor.
            self.leftover.clear();
            self.position_samples = target;
            self.pending_target = None;
        }

        let byte_offset = target * self.format.bytes_per_sample() as u64;
        self.notifier.seek(resolved, target, byte_offset);
        debug!(position_ms = resolved, sample = target, byte_offset, "seek");
        Ok(resolved)
    }

    pub(crate) fn set_notifier(&mut self, notifier: Notifier) {
        self.notifier = notifier;
    }

    fn ms_to_samples(&self, ms: u64) -> u64 {
        ms * self.format.sample_rate() as u64 / 1000 * self.format.channels() as u64
    }
}

impl PcmStage for SeekerStage {
    fn process(&mut self, chunk: &mut Vec<u8>) {
        if !self.leftover.is_empty() {
            // Prepend the sub-frame remainder from the previous chunk.
            let mut merged = std::mem::take(&mut self.leftover);
            merged.extend_from_slice(chunk);
            *chunk = merged;
        }
        let frame = self.format.bytes_per_frame();
        let whole = chunk.len() / frame * frame;
        self.leftover = chunk.split_off(whole);
        if chunk.is_empty() {
            return;
        }

        let chunk_samples = (chunk.len() / self.format.bytes_per_sample()) as u64;
        match self.pending_target {
            Some(target) if target >= self.position_samples + chunk_samples => {
                // The whole chunk lies before the target; skip it.
                self.position_samples += chunk_samples;
                chunk.clear();
            }
            Some(target) => {
                // The target falls inside this chunk: slice off the bytes
                // before it and emit the remainder.
                let skip = target.saturating_sub(self.position_samples) as usize;
                chunk.drain(..skip * self.format.bytes_per_sample());
                self.position_samples += chunk_samples;
                self.pending_target = None;
            }
            None => {
                self.position_samples += chunk_samples;
            }
        }
    }

    fn flush(&mut self, out: &mut Vec<u8>) {
        // End of stream: emit retained bytes that still form whole frames.
        let frame = self.format.bytes_per_frame();
        if self.leftover.len() >= frame {
            let whole = self.leftover.len() / frame * frame;
            out.extend_from_slice(&self.leftover[..whole]);
        }
        self.leftover.clear();
    }

    fn name(&self) -> &'static str {
        "seeker"
    }
}
