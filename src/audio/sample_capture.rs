// src/audio/sample_capture.rs
//! A wrapper source that taps decoded samples into a lock-free queue on their way to the speakers.

use std::time::Duration;

use ringbuf::{traits::*, HeapProd};
use rodio::Source;

/// Passes samples through unchanged while copying them into `tap`.
///
/// When the queue cannot take a whole frame, that frame is skipped for the tap
/// only, so the consumer always sees complete interleaved frames.
pub struct SampleCapture<S> {
    source: S,
    tap: HeapProd<i16>,
    channels: usize,
    frame_pos: usize,
    keep_frame: bool,
}

impl<S> SampleCapture<S>
where
    S: Source<Item = i16>,
{
    pub fn new(source: S, tap: HeapProd<i16>) -> Self {
        let channels = usize::from(source.channels()).max(1);
        Self {
            source,
            tap,
            channels,
            frame_pos: 0,
            keep_frame: false,
        }
    }
}

impl<S> Iterator for SampleCapture<S>
where
    S: Source<Item = i16>,
{
    type Item = i16;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.source.next()?;

        if self.frame_pos == 0 {
            self.keep_frame = self.tap.vacant_len() >= self.channels;
        }
        if self.keep_frame {
            let _ = self.tap.try_push(sample);
        }
        self.frame_pos = (self.frame_pos + 1) % self.channels;

        Some(sample)
    }
}

impl<S> Source for SampleCapture<S>
where
    S: Source<Item = i16>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.source.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.source.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.source.total_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::HeapRb;
    use rodio::buffer::SamplesBuffer;

    #[test]
    fn test_passes_samples_through_and_taps_them() {
        let (prod, mut cons) = HeapRb::<i16>::new(16).split();
        let source = SamplesBuffer::new(2, 44_100, vec![1i16, -1, 2, -2]);

        let played: Vec<i16> = SampleCapture::new(source, prod).collect();
        assert_eq!(played, vec![1, -1, 2, -2]);

        let mut tapped = [0i16; 8];
        let n = cons.pop_slice(&mut tapped);
        assert_eq!(&tapped[..n], &[1, -1, 2, -2]);
    }

    #[test]
    fn test_full_tap_drops_whole_frames() {
        let (prod, mut cons) = HeapRb::<i16>::new(3).split();
        let source = SamplesBuffer::new(2, 44_100, vec![1i16, -1, 2, -2, 3, -3]);

        let played: Vec<i16> = SampleCapture::new(source, prod).collect();
        assert_eq!(played.len(), 6);

        // Room for one and a half frames: only the first frame gets in.
        let mut tapped = [0i16; 8];
        let n = cons.pop_slice(&mut tapped);
        assert_eq!(&tapped[..n], &[1, -1]);
    }
}
