// src/audio/source/reader.rs
//! Polling reader loop with an adaptive sleep, shared by pull-style sources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::audio::channels::ChannelBuffers;
use crate::error::{Result, VizError};

/// Shortest sleep between two reads.
pub const DELAY_MIN: Duration = Duration::from_micros(500);
/// Longest sleep between two reads.
pub const DELAY_MAX: Duration = Duration::from_micros(5000);

const DELAY_INITIAL_US: i64 = 100;

/// Sleep length that grows while reads come back short and shrinks while they are full.
#[derive(Debug, Clone)]
pub struct AdaptiveDelay {
    delay_us: i64,
    min_us: i64,
    max_us: i64,
}

impl AdaptiveDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            delay_us: DELAY_INITIAL_US,
            min_us: min.as_micros() as i64,
            max_us: max.as_micros() as i64,
        }
    }

    /// Adjust by a quarter of the shortfall (in microseconds) and return the new delay.
    pub fn update(&mut self, requested: usize, received: usize) -> Duration {
        let shortfall = requested as i64 - received as i64;
        self.delay_us = (self.delay_us + shortfall / 4).clamp(self.min_us, self.max_us);
        self.current()
    }

    pub fn current(&self) -> Duration {
        Duration::from_micros(self.delay_us.max(0) as u64)
    }
}

impl Default for AdaptiveDelay {
    fn default() -> Self {
        Self::new(DELAY_MIN, DELAY_MAX)
    }
}

/// Non-blocking supplier of interleaved samples.
pub trait SampleReader: Send + 'static {
    /// Copy whatever is available into `out` and return the sample count.
    ///
    /// Never blocks for long and never fails; errors read as zero samples.
    fn read_samples(&mut self, out: &mut [i16]) -> usize;
}

/// Thread that polls a [`SampleReader`] and writes into the channel buffers.
pub struct ReaderThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReaderThread {
    /// Start polling `reader` for up to `chunk` samples per iteration.
    pub fn spawn<R: SampleReader>(
        name: &'static str,
        mut reader: R,
        chunk: usize,
        buffers: Arc<ChannelBuffers>,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut pre_buffer = vec![0i16; chunk.max(1)];
                let mut delay = AdaptiveDelay::default();

                while flag.load(Ordering::Acquire) {
                    let received = reader.read_samples(&mut pre_buffer);
                    if received > 0 {
                        buffers.write_interleaved(&pre_buffer[..received]);
                    }
                    thread::sleep(delay.update(pre_buffer.len(), received));
                }
                debug!(thread = name, "reader loop finished");
            })
            .map_err(|source| VizError::Thread { name, source })?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Signal the loop and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("reader thread panicked");
            }
        }
    }
}

impl Drop for ReaderThread {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    #[test]
    fn test_delay_starts_clamped_to_minimum() {
        let mut delay = AdaptiveDelay::default();
        assert_eq!(delay.update(100, 100), DELAY_MIN);
    }

    #[test]
    fn test_delay_grows_on_short_reads() {
        let mut delay = AdaptiveDelay::default();
        delay.update(1100, 1100);
        let after_short = delay.update(1100, 0);
        assert_eq!(after_short, Duration::from_micros(500 + 275));

        for _ in 0..100 {
            delay.update(1100, 0);
        }
        assert_eq!(delay.current(), DELAY_MAX);
    }

    #[test]
    fn test_delay_shrinks_when_data_flows() {
        let mut delay = AdaptiveDelay::default();
        for _ in 0..100 {
            delay.update(1100, 0);
        }
        // A surplus (e.g. a carried-over frame) pulls the delay back down.
        let before = delay.current();
        let after = delay.update(1100, 1100 + 400);
        assert!(after < before);

        for _ in 0..1000 {
            delay.update(1100, 2000);
        }
        assert_eq!(delay.current(), DELAY_MIN);
    }

    #[test]
    fn test_delay_respects_custom_bounds() {
        let mut delay = AdaptiveDelay::new(Duration::from_micros(10), Duration::from_micros(20));
        for received in [0, 50, 0, 0, 100, 0] {
            let d = delay.update(100, received);
            assert!(d >= Duration::from_micros(10) && d <= Duration::from_micros(20));
        }
    }

    struct Scripted {
        blocks: Arc<Mutex<Vec<Vec<i16>>>>,
    }

    impl SampleReader for Scripted {
        fn read_samples(&mut self, out: &mut [i16]) -> usize {
            let mut blocks = self.blocks.lock().unwrap();
            if blocks.is_empty() {
                return 0;
            }
            let block = blocks.remove(0);
            out[..block.len()].copy_from_slice(&block);
            block.len()
        }
    }

    #[test]
    fn test_reader_thread_writes_and_stops() {
        let buffers = Arc::new(ChannelBuffers::new(1, 4));
        let blocks = Arc::new(Mutex::new(vec![vec![1, 2], vec![3, 4, 5]]));
        let reader = Scripted {
            blocks: Arc::clone(&blocks),
        };

        let mut reader_thread =
            ReaderThread::spawn("test-reader", reader, 8, Arc::clone(&buffers)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !blocks.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        reader_thread.stop();
        assert!(!reader_thread.is_running());
        assert_eq!(buffers.read()[0].snapshot(), vec![2, 3, 4, 5]);
    }
}
