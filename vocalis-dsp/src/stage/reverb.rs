//! Feedback delay-network reverb
//!
//! A fixed set of parallel delay lines per channel, each with feedback into
//! its own buffer. Room size and damping scale the delayed signal; wet and
//! dry levels set the output mix.

use super::PcmStage;
use crate::events::Notifier;
use crate::pcm::PcmFormat;

/// Number of parallel delay lines per channel.
const NUM_DELAY_LINES: usize = 4;

/// Delay-line length as a fraction of the sample rate (50 ms).
const LINE_SECONDS: f64 = 0.05;

/// Fixed feedback applied to the value written back into each line.
const FEEDBACK: f64 = 0.5;

/// Reverb parameters, each clamped to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbConfig {
    pub room_size: f64,
    pub damping: f64,
    pub wet_level: f64,
    pub dry_level: f64,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.3,
            dry_level: 0.7,
        }
    }
}

impl ReverbConfig {
    fn clamped(mut self) -> Self {
        self.room_size = clamp_unit(self.room_size);
        self.damping = clamp_unit(self.damping);
        self.wet_level = clamp_unit(self.wet_level);
        self.dry_level = clamp_unit(self.dry_level);
        self
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// One circular delay buffer with its own write cursor.
struct DelayLine {
    buffer: Vec<f64>,
    cursor: usize,
}

impl DelayLine {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            cursor: 0,
        }
    }

    /// Read the delayed value scaled by `scale`, write back the input plus
    /// scaled feedback at the same cursor, and advance.
    fn tick(&mut self, input: f64, scale: f64) -> f64 {
        let scaled = self.buffer[self.cursor] * scale;
        self.buffer[self.cursor] = input + scaled * FEEDBACK;
        self.cursor = (self.cursor + 1) % self.buffer.len();
        scaled
    }
}

pub struct ReverbStage {
    format: PcmFormat,
    config: ReverbConfig,
    // Indexed [channel][line]
    lines: Vec<[DelayLine; NUM_DELAY_LINES]>,
    notifier: Notifier,
}

impl ReverbStage {
    pub fn new(format: PcmFormat, config: ReverbConfig) -> Self {
        let len = (format.sample_rate() as f64 * LINE_SECONDS) as usize;
        let lines = (0..format.channels())
            .map(|_| std::array::from_fn(|_| DelayLine::new(len)))
            .collect();
        Self {
            format,
            config: config.clamped(),
            lines,
            notifier: Notifier::disconnected(),
        }
    }

    /// Set the room size (clamped to [0, 1]).
    pub fn set_room_size(&mut self, size: f64) {
        self.config.room_size = clamp_unit(size);
        self.notify();
    }

    /// Set the damping (clamped to [0, 1]).
    pub fn set_damping(&mut self, damping: f64) {
        self.config.damping = clamp_unit(damping);
        self.notify();
    }

    /// Set the wet level (clamped to [0, 1]).
    pub fn set_wet_level(&mut self, wet: f64) {
        self.config.wet_level = clamp_unit(wet);
        self.notify();
    }

    /// Set the dry level (clamped to [0, 1]).
    pub fn set_dry_level(&mut self, dry: f64) {
        self.config.dry_level = clamp_unit(dry);
        self.notify();
    }

    /// Replace all four parameters at once; one event is emitted.
    pub fn set_params(&mut self, config: ReverbConfig) {
        self.config = config.clamped();
        self.notify();
    }

    pub fn params(&self) -> ReverbConfig {
        self.config
    }

    pub(crate) fn set_notifier(&mut self, notifier: Notifier) {
        self.notifier = notifier;
    }

    fn notify(&self) {
        self.notifier.reconfigured("reverb");
    }
}

impl PcmStage for ReverbStage {
    fn process(&mut self, chunk: &mut Vec<u8>) {
        let bytes = self.format.bytes_per_sample();
        let frame = self.format.bytes_per_frame();
        let whole = chunk.len() / frame * frame;
        let scale = self.config.room_size * (1.0 - self.config.damping);
        let wet_level = self.config.wet_level;
        let dry_level = self.config.dry_level;

        let mut offset = 0;
        while offset < whole {
            for (channel, lines) in self.lines.iter_mut().enumerate() {
                let pos = offset + channel * bytes;
                let input = self.format.read_sample(chunk, pos) as f64;

                let mut wet_sum = 0.0;
                for line in lines.iter_mut() {
                    wet_sum += line.tick(input, scale);
                }

                let output =
                    input * dry_level + (wet_sum / NUM_DELAY_LINES as f64) * wet_level;
                self.format
                    .write_sample(chunk, self.format.clamp(output.round() as i64), pos);
            }
            offset += frame;
        }
    }

    fn name(&self) -> &'static str {
        "reverb"
    }
}
