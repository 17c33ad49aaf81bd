// src/audio/mod.rs
//! Audio module - sample storage, sources and spectral analysis.

pub mod analyzer;
pub mod buffer;
pub mod channels;
pub mod sample_capture;
pub mod source;

// Re-export commonly used types
pub use analyzer::{BinRange, SpectralAnalyzer};
pub use buffer::{RingBuffer, MAX_AMPLITUDE};
pub use channels::ChannelBuffers;
pub use sample_capture::SampleCapture;
pub use source::{open_source, AudioSource};
