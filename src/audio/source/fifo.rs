// src/audio/source/fifo.rs
//! Raw PCM from a named pipe or a regular file.
//!
//! Point an MPD `fifo` output (format `44100:16:1` or `44100:16:2`) at the
//! path and this source picks the samples up as they arrive.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nix::fcntl::OFlag;
use tracing::{debug, info};

use super::reader::{ReaderThread, SampleReader};
use super::AudioSource;
use crate::audio::channels::ChannelBuffers;
use crate::config::{InputConfig, Source};
use crate::error::{Result, VizError};

const BYTES_PER_SAMPLE: usize = 2;

/// Reads S16LE PCM from a FIFO on a polling thread.
pub struct FifoSource {
    buffers: Arc<ChannelBuffers>,
    path: PathBuf,
    file: File,
    reader: Option<ReaderThread>,
}

impl FifoSource {
    /// Open `config.file` for reading.
    ///
    /// The file is opened non-blocking, so a FIFO without a writer does not
    /// stall here; it simply yields no data until a writer shows up.
    pub fn open(config: &InputConfig, buffers: Arc<ChannelBuffers>) -> Result<Self> {
        let file = open_nonblocking(&config.file)?;
        info!(path = %config.file.display(), "opened FIFO");
        Ok(Self {
            buffers,
            path: config.file.clone(),
            file,
            reader: None,
        })
    }
}

impl AudioSource for FifoSource {
    fn start_stream(&mut self, config: &InputConfig) -> Result<()> {
        self.stop_stream();

        if config.file != self.path {
            self.file = open_nonblocking(&config.file)?;
            self.path = config.file.clone();
            info!(path = %self.path.display(), "reopened FIFO");
        }

        let file = self.file.try_clone().map_err(|source| VizError::OpenSource {
            path: self.path.clone(),
            source,
        })?;
        let reader = PcmReader::new(file, config.channel_count());
        self.reader = Some(ReaderThread::spawn(
            "pcmviz-fifo",
            reader,
            config.latency,
            Arc::clone(&self.buffers),
        )?);
        debug!(channels = config.channel_count(), latency = config.latency, "FIFO stream started");
        Ok(())
    }

    fn stop_stream(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
            debug!("FIFO stream stopped");
        }
    }

    fn is_open(&self) -> bool {
        self.reader.as_ref().is_some_and(ReaderThread::is_running)
    }

    fn kind(&self) -> Source {
        Source::Fifo
    }
}

impl Drop for FifoSource {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

fn open_nonblocking(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)
        .map_err(|source| VizError::OpenSource {
            path: path.to_path_buf(),
            source,
        })
}

/// Decodes little-endian 16-bit PCM from any byte stream, whole frames at a time.
///
/// Bytes of an incomplete frame are held back until the rest arrives, so a
/// stereo block never starts on the right channel.
pub struct PcmReader<R> {
    inner: R,
    bytes: Vec<u8>,
    pending: usize,
    frame_bytes: usize,
}

impl<R: Read> PcmReader<R> {
    pub fn new(inner: R, channels: usize) -> Self {
        Self {
            inner,
            bytes: Vec::new(),
            pending: 0,
            frame_bytes: channels.max(1) * BYTES_PER_SAMPLE,
        }
    }

    fn fill(&mut self, out: &mut [i16]) -> usize {
        let capacity = out.len() * BYTES_PER_SAMPLE / self.frame_bytes * self.frame_bytes;
        if capacity == 0 {
            return 0;
        }
        if self.bytes.len() < capacity {
            self.bytes.resize(capacity, 0);
        }

        let read = match self.inner.read(&mut self.bytes[self.pending..capacity]) {
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => 0,
            Err(e) => {
                debug!("FIFO read failed: {e}");
                0
            }
        };

        let available = self.pending + read;
        let whole = available - available % self.frame_bytes;
        for (slot, pair) in out.iter_mut().zip(self.bytes[..whole].chunks_exact(BYTES_PER_SAMPLE)) {
            *slot = i16::from_le_bytes([pair[0], pair[1]]);
        }

        self.bytes.copy_within(whole..available, 0);
        self.pending = available - whole;
        whole / BYTES_PER_SAMPLE
    }
}

impl<R: Read + Send + 'static> SampleReader for PcmReader<R> {
    fn read_samples(&mut self, out: &mut [i16]) -> usize {
        self.fill(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn le_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Hands out its data in fixed-size pieces, like a pipe under load.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_decodes_little_endian_samples() {
        let mut reader = PcmReader::new(Cursor::new(le_bytes(&[1, -2, 300, i16::MIN])), 1);
        let mut out = [0i16; 8];
        assert_eq!(reader.fill(&mut out), 4);
        assert_eq!(&out[..4], &[1, -2, 300, i16::MIN]);
        assert_eq!(reader.fill(&mut out), 0);
    }

    #[test]
    fn test_partial_frames_are_carried_over() {
        let data = le_bytes(&[10, -10, 20, -20, 30, -30]);
        let mut reader = PcmReader::new(
            Trickle {
                data,
                pos: 0,
                step: 5,
            },
            2,
        );

        let mut out = [0i16; 8];
        let mut samples = Vec::new();
        for _ in 0..10 {
            let n = reader.fill(&mut out);
            assert_eq!(n % 2, 0, "stereo reads must be whole frames");
            samples.extend_from_slice(&out[..n]);
        }
        assert_eq!(samples, vec![10, -10, 20, -20, 30, -30]);
    }

    #[test]
    fn test_read_is_bounded_by_output() {
        let mut reader = PcmReader::new(Cursor::new(le_bytes(&[1, 2, 3, 4, 5])), 1);
        let mut out = [0i16; 2];
        assert_eq!(reader.fill(&mut out), 2);
        assert_eq!(out, [1, 2]);
        assert_eq!(reader.fill(&mut out), 2);
        assert_eq!(out, [3, 4]);
    }

    #[test]
    fn test_missing_file_is_a_setup_error() {
        let config = InputConfig {
            file: PathBuf::from("/nonexistent/pcmviz.fifo"),
            ..InputConfig::default()
        };
        let result = FifoSource::open(&config, Arc::new(ChannelBuffers::new(1, 16)));
        assert!(matches!(result, Err(VizError::OpenSource { .. })));
    }
}
