//! Linear gain stage

use std::fmt;

use tracing::warn;

use super::PcmStage;
use crate::error::DspError;
use crate::events::Notifier;
use crate::pcm::PcmFormat;

/// Ceiling for the public volume knob. Non-finite positive input saturates
/// here instead of propagating infinity into the gain math.
pub const MAX_VOLUME_PERCENT: f64 = 10_000.0;

/// Multiplies every sample by `volume / 100`.
pub struct VolumeStage {
    format: PcmFormat,
    volume: f64,
    enabled: bool,
    notifier: Notifier,
}

impl VolumeStage {
    /// Create the stage at the given volume percentage (100 = unity).
    pub fn new(format: PcmFormat, volume: f64) -> Result<Self, DspError> {
        let mut stage = Self {
            format,
            volume: 100.0,
            enabled: true,
            notifier: Notifier::disconnected(),
        };
        stage.set_volume(volume)?;
        Ok(stage)
    }

    /// Set the volume in percent. NaN and negative values are rejected
    /// without touching the current setting; positive infinity saturates to
    /// `MAX_VOLUME_PERCENT`.
    pub fn set_volume(&mut self, volume: f64) -> Result<(), DspError> {
        if volume.is_nan() || volume < 0.0 {
            return Err(DspError::InvalidVolume(volume));
        }
        let volume = if volume > MAX_VOLUME_PERCENT {
            warn!(volume, ceiling = MAX_VOLUME_PERCENT, "volume saturated to ceiling");
            MAX_VOLUME_PERCENT
        } else {
            volume
        };
        self.volume = volume;
        self.notifier.reconfigured("volume");
        Ok(())
    }

    /// Current volume in percent.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.notifier.reconfigured("volume");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_notifier(&mut self, notifier: Notifier) {
        self.notifier = notifier;
    }

    fn gain(&self) -> f64 {
        self.volume / 100.0
    }
}

impl fmt::Display for VolumeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.volume)
    }
}

impl PcmStage for VolumeStage {
    fn process(&mut self, chunk: &mut Vec<u8>) {
        // Bypass and unity gain take the same zero-iteration path.
        if !self.enabled || self.volume == 100.0 {
            return;
        }
        let gain = self.gain();
        let bytes = self.format.bytes_per_sample();
        let mut offset = 0;
        while offset + bytes <= chunk.len() {
            let scaled = self.format.read_sample(chunk, offset) as f64 * gain;
            self.format
                .write_sample(chunk, self.format.clamp(scaled.round() as i64), offset);
            offset += bytes;
        }
    }

    fn name(&self) -> &'static str {
        "volume"
    }
}
