// src/config/mod.rs
//! Pipeline configuration: audio input, FFT and display settings.
//!
//! The values are plain data. `main.rs` fills them from the command line and
//! the UI edits them at runtime before handing them to
//! [`Pipeline::reconfigure`](crate::app::Pipeline::reconfigure).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, VizError};

/// Audio backend the samples are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    /// Named pipe or regular file carrying raw S16LE PCM.
    #[default]
    Fifo,
    /// Capture stream from the system audio server.
    Server,
    /// A decoded audio file played on the default output.
    Playback,
}

impl Source {
    pub fn name(self) -> &'static str {
        match self {
            Source::Fifo => "fifo",
            Source::Server => "server",
            Source::Playback => "playback",
        }
    }
}

/// Settings for the audio input stream.
#[derive(Debug, Clone, PartialEq)]
pub struct InputConfig {
    pub source: Source,
    /// FIFO or raw PCM file path
    pub file: PathBuf,
    /// Capture device name, empty for the server's default input
    pub device: String,
    /// Audio file played by the playback source
    pub track: PathBuf,
    pub stereo: bool,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples requested per read by the reader threads
    pub latency: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: Source::Fifo,
            file: PathBuf::from("/tmp/mpd.fifo"),
            device: String::new(),
            track: PathBuf::new(),
            stereo: false,
            sample_rate: 44100,
            // 25 ms at 44.1 kHz
            latency: 1100,
        }
    }
}

impl InputConfig {
    pub fn channel_count(&self) -> usize {
        if self.stereo { 2 } else { 1 }
    }
}

/// Transform settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FftConfig {
    /// Transform length in samples
    pub size: usize,
}

impl Default for FftConfig {
    fn default() -> Self {
        Self { size: 1 << 12 }
    }
}

/// Complete configuration consumed by the pipeline driver.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input: InputConfig,
    pub fft: FftConfig,
    /// Length of the rolling sample window in milliseconds
    pub duration_ms: u32,
    /// Target frame rate of the render loop
    pub fps: u32,
    /// Lowest displayed frequency in Hz
    pub f_start: f32,
    /// Highest displayed frequency in Hz
    pub f_stop: f32,
    /// Level mapped to an empty bar
    pub min_db: f32,
    /// Level mapped to a full bar
    pub max_db: f32,
    /// Bar fall-off speed in full heights per second squared
    pub gravity: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            fft: FftConfig::default(),
            duration_ms: 100,
            fps: 60,
            f_start: 0.0,
            f_stop: 22050.0,
            min_db: -60.0,
            max_db: -5.0,
            gravity: 8.0,
        }
    }
}

impl PipelineConfig {
    /// Number of samples each channel's ring buffer holds.
    pub fn buffer_capacity(&self) -> usize {
        (self.input.sample_rate as u64 * self.duration_ms as u64 / 1000) as usize
    }

    pub fn channel_count(&self) -> usize {
        self.input.channel_count()
    }

    /// Frequency spacing between two FFT bins.
    pub fn d_freq(&self) -> f32 {
        self.input.sample_rate as f32 / self.fft.size as f32
    }

    /// Time budget of one rendered frame.
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fft.size < 2 {
            return Err(VizError::InvalidFftSize(self.fft.size));
        }
        let checks = [
            (self.fps == 0, "fps must be positive"),
            (self.input.sample_rate == 0, "sample rate must be positive"),
            (self.duration_ms == 0, "buffer duration must be positive"),
            (self.buffer_capacity() == 0, "buffer duration too short for the sample rate"),
            (self.input.latency == 0, "latency must be positive"),
            (self.f_start >= self.f_stop, "f_start must be below f_stop"),
            (self.min_db >= self.max_db, "min_db must be below max_db"),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, reason)) => Err(VizError::InvalidConfig((*reason).to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_derived_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.buffer_capacity(), 4410);
        assert_eq!(config.channel_count(), 1);
        assert!((config.d_freq() - 44100.0 / 4096.0).abs() < 1e-6);
        assert_eq!(config.frame_period(), Duration::from_nanos(16_666_666));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stereo_doubles_channels() {
        let mut input = InputConfig::default();
        assert_eq!(input.channel_count(), 1);
        input.stereo = true;
        assert_eq!(input.channel_count(), 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.fft.size = 1;
        assert!(matches!(config.validate(), Err(VizError::InvalidFftSize(1))));

        let mut config = PipelineConfig::default();
        config.fps = 0;
        assert!(matches!(config.validate(), Err(VizError::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.f_start = 5000.0;
        config.f_stop = 100.0;
        assert!(matches!(config.validate(), Err(VizError::InvalidConfig(_))));
    }
}
