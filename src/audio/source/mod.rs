// src/audio/source/mod.rs
//! Audio sources that feed raw PCM into the channel buffers.
//!
//! Every backend delivers interleaved signed 16-bit samples through
//! [`ChannelBuffers::write_interleaved`]. Opening or connecting happens in the
//! constructor, so a source that exists is ready to stream.

mod fifo;
mod playback;
mod reader;
mod server;
mod stream_thread;

use std::sync::Arc;

use super::channels::ChannelBuffers;
use crate::config::{InputConfig, Source};
use crate::error::Result;

pub use fifo::{FifoSource, PcmReader};
pub use playback::PlaybackSource;
pub use reader::{AdaptiveDelay, ReaderThread, SampleReader, DELAY_MAX, DELAY_MIN};
pub use server::ServerSource;
pub use stream_thread::CONNECT_TIMEOUT;

/// A running or stoppable producer of PCM samples.
pub trait AudioSource: Send {
    /// Start delivering samples for `config`, replacing any running stream.
    fn start_stream(&mut self, config: &InputConfig) -> Result<()>;

    /// Stop delivering samples.
    ///
    /// Returns only once the writer has exited, so the buffers may be
    /// resized or dropped right after.
    fn stop_stream(&mut self);

    /// True while a stream is running.
    fn is_open(&self) -> bool;

    /// Backend this source was built for.
    fn kind(&self) -> Source;
}

/// Build the backend selected by `config.source`.
pub fn open_source(
    config: &InputConfig,
    buffers: Arc<ChannelBuffers>,
) -> Result<Box<dyn AudioSource>> {
    Ok(match config.source {
        Source::Fifo => Box::new(FifoSource::open(config, buffers)?),
        Source::Server => Box::new(ServerSource::connect(config, buffers)?),
        Source::Playback => Box::new(PlaybackSource::open(config, buffers)?),
    })
}
