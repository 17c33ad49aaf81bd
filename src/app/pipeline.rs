// src/app/pipeline.rs
//! Pipeline driver: owns the buffers, one analyzer per channel and the source.
//!
//! The driver lives on the render thread. Sources write into the shared
//! [`ChannelBuffers`] from their own threads; once per frame [`Pipeline::tick`]
//! pulls a windowed copy of each buffer through its analyzer.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::audio::analyzer::{bin_frequency, BinRange, SpectralAnalyzer};
use crate::audio::buffer::{normalize_rms, MAX_AMPLITUDE};
use crate::audio::channels::{reconcile, ChannelBuffers};
use crate::audio::source::{open_source, AudioSource};
use crate::config::{PipelineConfig, Source};
use crate::error::Result;

/// Capture, buffering and analysis for every channel of one input.
pub struct Pipeline {
    config: PipelineConfig,
    buffers: Arc<ChannelBuffers>,
    analyzers: Vec<SpectralAnalyzer>,
    source: Option<Box<dyn AudioSource>>,
    last_error: Option<String>,
}

impl Pipeline {
    /// Build the channel set for `config` and start its source.
    ///
    /// Only an invalid configuration is an error. A source that cannot be
    /// opened leaves the pipeline running silent, with the reason kept in
    /// [`Pipeline::last_error`].
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let count = config.channel_count();
        let buffers = Arc::new(ChannelBuffers::new(count, config.buffer_capacity()));
        let analyzers = (0..count)
            .map(|_| SpectralAnalyzer::new(config.fft.size))
            .collect::<Result<Vec<_>>>()?;

        let mut pipeline = Self {
            config,
            buffers,
            analyzers,
            source: None,
            last_error: None,
        };
        pipeline.start_source();
        Ok(pipeline)
    }

    /// Run the analyzers over every channel that received new samples.
    ///
    /// Returns how many transforms ran.
    pub fn tick(&mut self) -> usize {
        let channels = self.buffers.read();
        let mut ran = 0;
        for (analyzer, buffer) in self.analyzers.iter_mut().zip(channels.iter()) {
            if analyzer.calculate(buffer) {
                ran += 1;
            }
        }
        ran
    }

    /// Apply a new configuration.
    ///
    /// The source is stopped before any buffer is touched and restarted
    /// afterwards. Settings that only concern the transform or the display
    /// leave the stream running.
    pub fn reconfigure(&mut self, config: PipelineConfig) -> Result<()> {
        if config == self.config {
            return Ok(());
        }
        config.validate()?;

        let input_changed = config.input != self.config.input;
        let resize_buffers = input_changed || config.buffer_capacity() != self.config.buffer_capacity();
        let kind_changed = config.input.source != self.config.input.source;

        if kind_changed {
            // Dropping a source stops it.
            if let Some(source) = self.source.take() {
                debug!(from = source.kind().name(), to = config.input.source.name(), "switching source");
            }
        } else if resize_buffers {
            if let Some(source) = self.source.as_mut() {
                source.stop_stream();
            }
        }

        if resize_buffers {
            let count = config.channel_count();
            let mut channels = self.buffers.write();
            reconcile(&mut channels, count, config.buffer_capacity());
            self.analyzers.truncate(count);
            while self.analyzers.len() < count {
                self.analyzers.push(SpectralAnalyzer::new(config.fft.size)?);
            }
        }
        for analyzer in &mut self.analyzers {
            analyzer.resize(config.fft.size)?;
        }

        info!(
            source = config.input.source.name(),
            channels = config.channel_count(),
            capacity = config.buffer_capacity(),
            fft_size = config.fft.size,
            "pipeline reconfigured"
        );
        self.config = config;

        if resize_buffers {
            self.start_source();
        }
        Ok(())
    }

    /// Open the configured source if needed and start it, degrading on failure.
    fn start_source(&mut self) {
        let input = &self.config.input;

        if self.source.is_none() {
            match open_source(input, Arc::clone(&self.buffers)) {
                Ok(source) => self.source = Some(source),
                Err(e) => {
                    warn!(source = input.source.name(), "source unavailable, running without input: {e}");
                    self.last_error = Some(e.to_string());
                    return;
                }
            }
        }

        if let Some(source) = self.source.as_mut() {
            match source.start_stream(input) {
                Ok(()) => self.last_error = None,
                Err(e) => {
                    warn!(source = input.source.name(), "failed to start stream: {e}");
                    self.last_error = Some(e.to_string());
                }
            }
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn buffers(&self) -> &Arc<ChannelBuffers> {
        &self.buffers
    }

    pub fn channel_count(&self) -> usize {
        self.analyzers.len()
    }

    pub fn analyzer(&self, channel: usize) -> Option<&SpectralAnalyzer> {
        self.analyzers.get(channel)
    }

    /// Kind of the source currently attached, if any.
    pub fn source_kind(&self) -> Option<Source> {
        self.source.as_ref().map(|s| s.kind())
    }

    /// True while the attached source is streaming.
    pub fn is_streaming(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.is_open())
    }

    /// Why the last source open or start failed, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Bins covering the configured display range.
    pub fn bin_range(&self) -> BinRange {
        BinRange::from_frequencies(
            self.config.f_start,
            self.config.f_stop,
            self.config.input.sample_rate,
            self.config.fft.size,
        )
    }

    /// Signal level of `channel` in 0..=1, a full-scale square wave reading one.
    pub fn level(&self, channel: usize) -> Option<f32> {
        let channels = self.buffers.read();
        let buffer = channels.get(channel)?;
        Some(normalize_rms(buffer.rms(), buffer.capacity(), MAX_AMPLITUDE))
    }

    /// Frequency of the strongest bin inside the display range.
    pub fn dominant_frequency(&self, channel: usize) -> Option<f32> {
        let analyzer = self.analyzers.get(channel)?;
        let range = self.bin_range();
        let bin = analyzer.max_bin(range.data_offset, range.end());
        Some(bin_frequency(bin, self.config.input.sample_rate, analyzer.fft_size()))
    }

    /// Levels in dB of the bins inside the display range.
    pub fn spectrum(&self, channel: usize) -> Option<Vec<f32>> {
        let analyzer = self.analyzers.get(channel)?;
        let range = self.bin_range();
        let mut db = analyzer.magnitudes(MAX_AMPLITUDE);
        db.truncate(range.end());
        db.drain(..range.data_offset.min(db.len()));
        Some(db)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.stop_stream();
        }
    }
}
