// src/audio/source/playback.rs
//! Play an audio file and visualize what is being played.
//!
//! The decoded track goes to the default output device through rodio. A
//! [`SampleCapture`] wrapper copies every played sample into a lock-free
//! queue, and a reader thread drains that queue into the channel buffers.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ringbuf::{traits::*, HeapCons, HeapRb};
use rodio::source::UniformSourceIterator;
use rodio::{Decoder, OutputStream, Sink};
use tracing::{debug, info};

use super::reader::{ReaderThread, SampleReader};
use super::stream_thread::StreamThread;
use super::AudioSource;
use crate::audio::channels::ChannelBuffers;
use crate::audio::sample_capture::SampleCapture;
use crate::config::{InputConfig, Source};
use crate::error::{Result, VizError};

/// Decoder over a buffered file, as rodio reads it.
type TrackDecoder = Decoder<BufReader<File>>;

/// Plays `config.track` and feeds the played samples to the pipeline.
pub struct PlaybackSource {
    buffers: Arc<ChannelBuffers>,
    track: PathBuf,
    player: Option<StreamThread>,
    drain: Option<ReaderThread>,
}

impl PlaybackSource {
    /// Open the track and make sure it decodes.
    pub fn open(config: &InputConfig, buffers: Arc<ChannelBuffers>) -> Result<Self> {
        let decoder = open_track(&config.track)?;
        info!(
            track = %config.track.display(),
            channels = rodio::Source::channels(&decoder),
            rate = rodio::Source::sample_rate(&decoder),
            "opened track"
        );

        Ok(Self {
            buffers,
            track: config.track.clone(),
            player: None,
            drain: None,
        })
    }
}

impl AudioSource for PlaybackSource {
    fn start_stream(&mut self, config: &InputConfig) -> Result<()> {
        self.stop_stream();

        if config.track != self.track {
            open_track(&config.track)?;
            self.track = config.track.clone();
        }

        let channels = config.channel_count();
        let rate = config.sample_rate;
        // A quarter second of audio between the output thread and the drain.
        let queue_len = (rate as usize * channels / 4).max(channels);
        let (prod, cons) = HeapRb::<i16>::new(queue_len).split();

        let track = self.track.clone();
        let player = StreamThread::spawn("pcmviz-player", move || {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| VizError::Stream(format!("no output device: {e}")))?;
            let sink = Sink::try_new(&handle)
                .map_err(|e| VizError::Stream(format!("failed to create sink: {e}")))?;

            let decoder = open_track(&track)?;
            let converted: UniformSourceIterator<TrackDecoder, i16> =
                UniformSourceIterator::new(decoder, channels as u16, rate);
            sink.append(SampleCapture::new(converted, prod));
            sink.play();

            Ok(Player {
                sink,
                _stream: stream,
            })
        })?;

        let tap = TapReader { cons, channels };
        let drain = match ReaderThread::spawn(
            "pcmviz-playback",
            tap,
            config.latency,
            Arc::clone(&self.buffers),
        ) {
            Ok(drain) => drain,
            Err(e) => {
                let mut player = player;
                player.stop();
                return Err(e);
            }
        };

        self.player = Some(player);
        self.drain = Some(drain);
        debug!(track = %self.track.display(), channels, rate, "playback started");
        Ok(())
    }

    fn stop_stream(&mut self) {
        // Output first, so nothing is pushed into a queue nobody drains.
        if let Some(mut player) = self.player.take() {
            player.stop();
        }
        if let Some(mut drain) = self.drain.take() {
            drain.stop();
            debug!("playback stopped");
        }
    }

    fn is_open(&self) -> bool {
        self.player.is_some() && self.drain.as_ref().is_some_and(ReaderThread::is_running)
    }

    fn kind(&self) -> Source {
        Source::Playback
    }
}

impl Drop for PlaybackSource {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

/// Output stream and sink, kept alive on the player thread.
struct Player {
    sink: Sink,
    _stream: OutputStream,
}

impl Drop for Player {
    fn drop(&mut self) {
        self.sink.stop();
    }
}

fn open_track(path: &Path) -> Result<TrackDecoder> {
    let file = File::open(path).map_err(|source| VizError::OpenSource {
        path: path.to_path_buf(),
        source,
    })?;
    Decoder::new(BufReader::new(file)).map_err(|e| VizError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Consumer end of the capture queue, read in whole frames.
struct TapReader {
    cons: HeapCons<i16>,
    channels: usize,
}

impl SampleReader for TapReader {
    fn read_samples(&mut self, out: &mut [i16]) -> usize {
        let available = self.cons.occupied_len().min(out.len());
        let whole = available - available % self.channels.max(1);
        self.cons.pop_slice(&mut out[..whole])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_tap_reader_pops_whole_frames() {
        let (mut prod, cons) = HeapRb::<i16>::new(8).split();
        prod.push_slice(&[1, -1, 2, -2, 3]);

        let mut tap = TapReader { cons, channels: 2 };
        let mut out = [0i16; 8];
        assert_eq!(tap.read_samples(&mut out), 4);
        assert_eq!(&out[..4], &[1, -1, 2, -2]);

        // The lone left sample waits for its partner.
        assert_eq!(tap.read_samples(&mut out), 0);
        prod.push_slice(&[-3]);
        assert_eq!(tap.read_samples(&mut out), 2);
        assert_eq!(&out[..2], &[3, -3]);
    }

    #[test]
    fn test_missing_track_is_open_error() {
        let config = InputConfig {
            source: Source::Playback,
            track: PathBuf::from("/nonexistent/track.flac"),
            ..InputConfig::default()
        };
        let result = PlaybackSource::open(&config, Arc::new(ChannelBuffers::new(1, 16)));
        assert!(matches!(result, Err(VizError::OpenSource { .. })));
    }

    #[test]
    fn test_garbage_track_is_decode_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not audio").unwrap();

        let config = InputConfig {
            source: Source::Playback,
            track: file.path().to_path_buf(),
            ..InputConfig::default()
        };
        let result = PlaybackSource::open(&config, Arc::new(ChannelBuffers::new(1, 16)));
        assert!(matches!(result, Err(VizError::Decode { .. })));
    }
}
