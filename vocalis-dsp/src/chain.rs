//! Pipeline orchestration
//!
//! Builds an ordered set of optional stages around the incoming byte stream
//! and owns their lifecycle. Data flows one direction:
//!
//! ```text
//! source → Seeker → Equalizer → Compressor → Reverb → Biquad → Volume → sink
//! ```
//!
//! Stages left out of the configuration are never instantiated, so a chain
//! with an empty configuration is a true passthrough. Every stage is wired
//! to a shared notifier; reconfiguration and seek events surface on one
//! receiver for telemetry/UI sync.

use crossbeam_channel::Receiver;
use tracing::debug;

use crate::error::DspError;
use crate::events::{ChainEvent, Notifier};
use crate::pcm::PcmFormat;
use crate::stage::{
    BiquadConfig, CompressorConfig, CompressorParams, CompressorStage, EqualizerConfig,
    EqualizerStage, FilterStage, PcmStage, ReverbConfig, ReverbStage, SeekerStage, VolumeStage,
};

/// Plain toggle set for the dynamics stages; enables a stage with default
/// parameters. Explicit per-stage configuration takes precedence.
#[derive(Debug, Clone, Copy, Default)]
pub struct DspFilterConfig {
    pub compressor: bool,
    pub reverb: bool,
}

/// Seek stage configuration.
#[derive(Debug, Clone, Copy)]
pub struct SeekConfig {
    /// Known stream duration. Must be positive.
    pub total_duration_ms: u64,
    /// Optional initial target; negative values are measured from the end.
    pub target_ms: Option<i64>,
}

/// Per-pipeline configuration. Every stage is optional and independently
/// toggleable.
#[derive(Debug, Clone, Default)]
pub struct ChainConfig {
    pub equalizer: Option<EqualizerConfig>,
    pub filters: Option<DspFilterConfig>,
    pub compressor: Option<CompressorConfig>,
    pub reverb: Option<ReverbConfig>,
    pub biquad: Option<BiquadConfig>,
    pub volume: Option<f64>,
    pub seek: Option<SeekConfig>,
    /// Geometry-only resampler target: rewrites the sample rate every stage
    /// sees. The resampling itself happens outside this core.
    pub sample_rate: Option<u32>,
}

/// Ordered processing graph over a PCM byte stream.
pub struct FilterChain {
    format: PcmFormat,
    seeker: Option<SeekerStage>,
    equalizer: Option<EqualizerStage>,
    compressor: Option<CompressorStage>,
    reverb: Option<ReverbStage>,
    biquad: Option<FilterStage>,
    volume: Option<VolumeStage>,
    notifier: Notifier,
    events: Receiver<ChainEvent>,
    created: bool,
}

impl FilterChain {
    /// Create an empty chain over the given stream geometry. No stages are
    /// instantiated until `create` is called.
    pub fn new(format: PcmFormat) -> Self {
        let (notifier, events) = Notifier::channel();
        Self {
            format,
            seeker: None,
            equalizer: None,
            compressor: None,
            reverb: None,
            biquad: None,
            volume: None,
            notifier,
            events,
            created: false,
        }
    }

    /// Receiver for reconfiguration and seek events.
    pub fn events(&self) -> Receiver<ChainEvent> {
        self.events.clone()
    }

    /// Current stream geometry.
    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Build the stage topology. Any existing topology is torn down first;
    /// stages absent from the configuration are never instantiated.
    pub fn create(&mut self, config: &ChainConfig) -> Result<(), DspError> {
        self.teardown("create");

        if let Some(rate) = config.sample_rate {
            self.format.set_sample_rate(rate)?;
        }
        let format = self.format;

        if let Some(seek) = &config.seek {
            let mut seeker = SeekerStage::new(format, seek.total_duration_ms)?;
            seeker.set_notifier(self.notifier.clone());
            if let Some(target) = seek.target_ms {
                seeker.seek(target)?;
            }
            self.seeker = Some(seeker);
        }

        if let Some(eq) = &config.equalizer {
            let mut stage = EqualizerStage::new(format, eq.bands())?;
            stage.set_notifier(self.notifier.clone());
            self.equalizer = Some(stage);
        }

        let toggles = config.filters.unwrap_or_default();

        if config.compressor.is_some() || toggles.compressor {
            let mut stage = CompressorStage::new(format);
            if let Some(params) = &config.compressor {
                stage.set_params(params);
            }
            stage.set_notifier(self.notifier.clone());
            self.compressor = Some(stage);
        }

        if config.reverb.is_some() || toggles.reverb {
            let mut stage = ReverbStage::new(format, config.reverb.unwrap_or_default());
            stage.set_notifier(self.notifier.clone());
            self.reverb = Some(stage);
        }

        if let Some(biquad) = &config.biquad {
            let mut stage = FilterStage::new(format, biquad)?;
            stage.set_notifier(self.notifier.clone());
            self.biquad = Some(stage);
        }

        if let Some(volume) = config.volume {
            let mut stage = VolumeStage::new(format, volume)?;
            stage.set_notifier(self.notifier.clone());
            self.volume = Some(stage);
        }

        self.created = true;
        debug!(stages = ?self.stage_names(), "filter chain created");
        Ok(())
    }

    /// True when no stages are instantiated and `process` is the identity.
    pub fn is_passthrough(&self) -> bool {
        self.seeker.is_none()
            && self.equalizer.is_none()
            && self.compressor.is_none()
            && self.reverb.is_none()
            && self.biquad.is_none()
            && self.volume.is_none()
    }

    /// Names of the instantiated stages, in processing order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if let Some(s) = &self.seeker {
            names.push(s.name());
        }
        if let Some(s) = &self.equalizer {
            names.push(s.name());
        }
        if let Some(s) = &self.compressor {
            names.push(s.name());
        }
        if let Some(s) = &self.reverb {
            names.push(s.name());
        }
        if let Some(s) = &self.biquad {
            names.push(s.name());
        }
        if let Some(s) = &self.volume {
            names.push(s.name());
        }
        names
    }

    /// Push one chunk through the chain in order.
    pub fn process(&mut self, chunk: &mut Vec<u8>) {
        if let Some(seeker) = self.seeker.as_mut() {
            seeker.process(chunk);
        }
        for stage in self.transform_stages() {
            stage.process(chunk);
        }
    }

    /// Flush any retained bytes at end of stream, routing them through the
    /// rest of the chain. Returns the final bytes to emit downstream.
    pub fn finish(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(seeker) = self.seeker.as_mut() {
            seeker.flush(&mut out);
        }
        if !out.is_empty() {
            for stage in self.transform_stages() {
                stage.process(&mut out);
            }
        }
        out
    }

    /// Tear down every stage. Safe to call on stream close, on upstream
    /// error, or explicitly; idempotent. A premature close is a clean
    /// shutdown, so callers route it here rather than surfacing a failure.
    pub fn destroy(&mut self) {
        self.teardown("destroy");
    }

    fn teardown(&mut self, reason: &'static str) {
        self.seeker = None;
        self.equalizer = None;
        self.compressor = None;
        self.reverb = None;
        self.biquad = None;
        self.volume = None;
        if self.created {
            self.created = false;
            debug!(reason, "filter chain destroyed");
        }
    }

    /// Stages after the seeker, in processing order.
    fn transform_stages(&mut self) -> impl Iterator<Item = &mut dyn PcmStage> {
        let mut stages: Vec<&mut dyn PcmStage> = Vec::new();
        if let Some(s) = self.equalizer.as_mut() {
            stages.push(s);
        }
        if let Some(s) = self.compressor.as_mut() {
            stages.push(s);
        }
        if let Some(s) = self.reverb.as_mut() {
            stages.push(s);
        }
        if let Some(s) = self.biquad.as_mut() {
            stages.push(s);
        }
        if let Some(s) = self.volume.as_mut() {
            stages.push(s);
        }
        stages.into_iter()
    }

    // Live reconfiguration. Each call delegates to the stage when it was
    // built and errors otherwise.

    pub fn seek(&mut self, ms: i64) -> Result<u64, DspError> {
        self.seeker
            .as_mut()
            .ok_or(DspError::StageNotConfigured("seeker"))?
            .seek(ms)
    }

    pub fn set_equalizer(&mut self, config: &EqualizerConfig) -> Result<(), DspError> {
        self.equalizer
            .as_mut()
            .ok_or(DspError::StageNotConfigured("equalizer"))?
            .set_bands(config.bands())
    }

    pub fn set_compressor(&mut self, config: &CompressorConfig) -> Result<(), DspError> {
        self.compressor
            .as_mut()
            .ok_or(DspError::StageNotConfigured("compressor"))?
            .set_params(config);
        Ok(())
    }

    pub fn compressor_params(&self) -> Option<CompressorParams> {
        self.compressor.as_ref().map(|c| c.params())
    }

    pub fn set_reverb(&mut self, config: ReverbConfig) -> Result<(), DspError> {
        self.reverb
            .as_mut()
            .ok_or(DspError::StageNotConfigured("reverb"))?
            .set_params(config);
        Ok(())
    }

    pub fn set_biquad(&mut self, config: &BiquadConfig) -> Result<(), DspError> {
        let stage = self
            .biquad
            .as_mut()
            .ok_or(DspError::StageNotConfigured("biquad"))?;
        stage.set_kind(config.kind)?;
        stage.set_frequency(config.frequency)?;
        stage.set_q(config.q)?;
        stage.set_gain(config.gain_db)
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<(), DspError> {
        self.volume
            .as_mut()
            .ok_or(DspError::StageNotConfigured("volume"))?
            .set_volume(volume)
    }

    pub fn volume(&self) -> Option<f64> {
        self.volume.as_ref().map(|v| v.volume())
    }
}

impl Drop for FilterChain {
    fn drop(&mut self) {
        self.teardown("drop");
    }
}
