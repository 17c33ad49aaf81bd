// src/main.rs
//! pcmviz - real-time spectrum and oscilloscope for a PCM stream in the terminal.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use pcmviz::config::{FftConfig, InputConfig, PipelineConfig, Source};

#[derive(Parser)]
#[command(name = "pcmviz", version, about = "Terminal audio visualizer")]
struct Cli {
    /// Where the samples come from
    #[arg(long, value_enum, default_value = "fifo")]
    source: SourceArg,

    /// FIFO or raw S16LE file to read (fifo source)
    #[arg(long, default_value = "/tmp/mpd.fifo")]
    file: PathBuf,

    /// Capture device name, default input if empty (server source)
    #[arg(long, default_value = "")]
    device: String,

    /// Audio file to play and visualize (playback source)
    #[arg(long)]
    track: Option<PathBuf>,

    /// Treat the input as interleaved stereo
    #[arg(long)]
    stereo: bool,

    /// Sample rate of the input in Hz
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Samples requested per read
    #[arg(long, default_value_t = 1100)]
    latency: usize,

    /// FFT length in samples
    #[arg(long, default_value_t = 4096)]
    fft_size: usize,

    /// Length of the sample window in milliseconds
    #[arg(long, default_value_t = 100)]
    duration: u32,

    /// Target frame rate
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Lowest displayed frequency in Hz
    #[arg(long, default_value_t = 0.0)]
    f_start: f32,

    /// Highest displayed frequency in Hz
    #[arg(long, default_value_t = 22050.0)]
    f_stop: f32,

    /// Level of an empty bar in dB
    #[arg(long, default_value_t = -60.0, allow_hyphen_values = true)]
    min_db: f32,

    /// Level of a full bar in dB
    #[arg(long, default_value_t = -5.0, allow_hyphen_values = true)]
    max_db: f32,

    /// Bar fall-off in heights per second squared
    #[arg(long, default_value_t = 8.0)]
    gravity: f32,

    /// Write logs here (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    Fifo,
    Server,
    Playback,
}

impl From<SourceArg> for Source {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Fifo => Source::Fifo,
            SourceArg::Server => Source::Server,
            SourceArg::Playback => Source::Playback,
        }
    }
}

impl Cli {
    fn into_config(self) -> PipelineConfig {
        PipelineConfig {
            input: InputConfig {
                source: self.source.into(),
                file: self.file,
                device: self.device,
                track: self.track.unwrap_or_default(),
                stereo: self.stereo,
                sample_rate: self.sample_rate,
                latency: self.latency,
            },
            fft: FftConfig {
                size: self.fft_size,
            },
            duration_ms: self.duration,
            fps: self.fps,
            f_start: self.f_start,
            f_stop: self.f_stop,
            min_db: self.min_db,
            max_db: self.max_db,
            gravity: self.gravity,
        }
    }
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pcmviz=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    if let Some(path) = cli.log_file.take() {
        init_logging(&path)?;
    }

    let config = cli.into_config();
    config
        .validate()
        .context("invalid command line configuration")?;

    pcmviz::ui::run(config)
}
