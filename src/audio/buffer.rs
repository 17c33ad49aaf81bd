// src/audio/buffer.rs
//! Fixed-capacity sample store shared between a writer thread and the renderer.
//!
//! The buffer is a shift register rather than a circular queue: new samples
//! push the oldest ones out at the front and land at the tail, so readers
//! always see one contiguous, chronologically ordered slice.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Largest magnitude of a signed 16-bit sample.
pub const MAX_AMPLITUDE: f32 = 32768.0;

struct BufferState {
    samples: Vec<i16>,
    /// Set by every write, cleared by the consumer once it has read the data
    dirty: bool,
}

/// Most recent `capacity` samples of one audio channel.
pub struct RingBuffer {
    state: Mutex<BufferState>,
}

/// Scoped lock over a [`RingBuffer`].
///
/// Hold one guard across any check-then-act sequence, e.g. "is it dirty?
/// copy it, clear the flag". Writers block until the guard is dropped.
pub struct BufferGuard<'a> {
    state: MutexGuard<'a, BufferState>,
}

impl BufferGuard<'_> {
    /// Stored samples, oldest first.
    pub fn samples(&self) -> &[i16] {
        &self.state.samples
    }

    pub fn capacity(&self) -> usize {
        self.state.samples.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.state.dirty = false;
    }
}

impl RingBuffer {
    /// Create a zero-filled buffer. It starts dirty so the first frame is analyzed.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BufferState {
                samples: vec![0; capacity],
                dirty: true,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BufferState> {
        // A panicking holder cannot leave the samples half-valid, so keep going.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the buffer for a multi-step read.
    pub fn acquire_lock(&self) -> BufferGuard<'_> {
        BufferGuard {
            state: self.lock_state(),
        }
    }

    /// Append `samples`, evicting the oldest data.
    ///
    /// Blocks longer than the capacity keep only their most recent samples.
    pub fn write(&self, samples: &[i16]) {
        let mut state = self.lock_state();
        state.dirty = true;

        let n = samples.len().min(state.samples.len());
        let newest = &samples[samples.len() - n..];
        let start = shift_out(&mut state.samples, n);
        state.samples[start..].copy_from_slice(newest);
    }

    /// Append every `stride`-th sample of `samples`, starting at index `phase`.
    ///
    /// Splits one channel out of an interleaved block: stride 2 with phase 0
    /// selects the left channel, phase 1 the right one.
    pub fn write_strided(&self, samples: &[i16], stride: usize, phase: usize) {
        let mut state = self.lock_state();
        state.dirty = true;

        let selected = strided_len(samples.len(), stride, phase);
        let n = selected.min(state.samples.len());
        if n == 0 {
            return;
        }

        let start = shift_out(&mut state.samples, n);
        let newest = samples
            .iter()
            .skip(phase)
            .step_by(stride)
            .skip(selected - n)
            .copied();
        for (slot, sample) in state.samples[start..].iter_mut().zip(newest) {
            *slot = sample;
        }
    }

    /// Change the capacity, keeping the most recent samples.
    ///
    /// Growing pads with silence at the old end. Must not be called while a
    /// source is writing into the buffer.
    pub fn resize(&self, capacity: usize) {
        let mut state = self.lock_state();
        let current = state.samples.len();
        if current == capacity {
            return;
        }

        if capacity < current {
            state.samples.drain(..current - capacity);
        } else {
            state
                .samples
                .splice(0..0, std::iter::repeat_n(0, capacity - current));
        }
        state.dirty = true;
    }

    pub fn capacity(&self) -> usize {
        self.lock_state().samples.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.lock_state().dirty
    }

    /// Copy of the stored samples, oldest first.
    pub fn snapshot(&self) -> Vec<i16> {
        self.lock_state().samples.clone()
    }

    /// Sum of squared samples.
    ///
    /// Unnormalized; see [`normalize_rms`] for a 0..1 level.
    pub fn rms(&self) -> f32 {
        let state = self.lock_state();
        state
            .samples
            .iter()
            .map(|&s| {
                let s = s as f32;
                s * s
            })
            .sum()
    }
}

/// Turn the raw sum from [`RingBuffer::rms`] into a 0..1 level.
pub fn normalize_rms(sum: f32, len: usize, max_amplitude: f32) -> f32 {
    if len == 0 {
        return 0.0;
    }
    (sum / (len as f32 * max_amplitude * max_amplitude)).sqrt()
}

/// Move everything left by `n` slots and return where the free tail starts.
fn shift_out(samples: &mut [i16], n: usize) -> usize {
    samples.copy_within(n.., 0);
    samples.len() - n
}

/// Number of samples a strided read of a `len`-sample block selects.
fn strided_len(len: usize, stride: usize, phase: usize) -> usize {
    if stride == 0 || phase >= len {
        0
    } else {
        (len - phase).div_ceil(stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn range(from: i16, to: i16) -> Vec<i16> {
        (from..=to).collect()
    }

    #[test]
    fn test_new_buffer_is_zeroed_and_dirty() {
        let buf = RingBuffer::new(8);
        assert_eq!(buf.snapshot(), vec![0; 8]);
        assert!(buf.is_dirty());
    }

    #[test]
    fn test_append_evicts_oldest() {
        let buf = RingBuffer::new(10);
        buf.write(&range(1, 10));
        assert_eq!(buf.snapshot(), range(1, 10));

        buf.write(&[11, 12]);
        assert_eq!(buf.snapshot(), range(3, 12));
    }

    #[test]
    fn test_oversized_write_keeps_newest() {
        let buf = RingBuffer::new(4);
        buf.write(&range(1, 9));
        assert_eq!(buf.snapshot(), vec![6, 7, 8, 9]);
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn test_strided_deinterleave() {
        let buf = RingBuffer::new(10);
        buf.write(&range(3, 12));

        buf.write_strided(&[13, 14, 15, 16, 17], 2, 0);
        assert_eq!(buf.snapshot(), vec![6, 7, 8, 9, 10, 11, 12, 13, 15, 17]);

        buf.write_strided(&[13, 14, 15, 16, 17], 2, 1);
        assert_eq!(buf.snapshot(), vec![8, 9, 10, 11, 12, 13, 15, 17, 14, 16]);
    }

    #[test]
    fn test_strided_write_larger_than_capacity() {
        let buf = RingBuffer::new(3);
        // left channel: 0, 2, 4, 6, 8
        let block: Vec<i16> = (0..10).collect();
        buf.write_strided(&block, 2, 0);
        assert_eq!(buf.snapshot(), vec![4, 6, 8]);
    }

    #[test]
    fn test_strided_degenerate_arguments() {
        let buf = RingBuffer::new(3);
        buf.write(&[1, 2, 3]);
        buf.write_strided(&[9, 9], 0, 0);
        buf.write_strided(&[9, 9], 2, 5);
        assert_eq!(buf.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn test_resize_truncates_and_behaves_like_new() {
        let buf = RingBuffer::new(10);
        buf.write(&range(1, 10));
        buf.resize(5);
        assert_eq!(buf.capacity(), 5);
        assert_eq!(buf.snapshot(), range(6, 10));

        let fresh = RingBuffer::new(5);
        for block in [vec![1, 2, 3, 4, 5], vec![6, 7]] {
            buf.write(&block);
            fresh.write(&block);
        }
        assert_eq!(buf.snapshot(), vec![3, 4, 5, 6, 7]);
        assert_eq!(buf.snapshot(), fresh.snapshot());

        buf.write_strided(&[8, 9, 10, 11, 12], 2, 0);
        assert_eq!(buf.snapshot(), vec![6, 7, 8, 10, 12]);
        buf.write_strided(&[8, 9, 10, 11, 12], 2, 1);
        assert_eq!(buf.snapshot(), vec![8, 10, 12, 9, 11]);
    }

    #[test]
    fn test_resize_grows_with_leading_silence() {
        let buf = RingBuffer::new(3);
        buf.write(&[1, 2, 3]);
        buf.acquire_lock().clear_dirty();

        buf.resize(3);
        assert!(!buf.is_dirty());

        buf.resize(5);
        assert!(buf.is_dirty());
        assert_eq!(buf.snapshot(), vec![0, 0, 1, 2, 3]);
    }

    #[test]
    fn test_capacity_invariant_over_mixed_calls() {
        let buf = RingBuffer::new(7);
        let block: Vec<i16> = (0..23).collect();
        for step in 0..40usize {
            match step % 4 {
                0 => buf.write(&block[..step % 23]),
                1 => buf.write_strided(&block, 1 + step % 3, step % 2),
                2 => buf.resize(1 + step % 11),
                _ => buf.write(&block),
            }
            let guard = buf.acquire_lock();
            assert_eq!(guard.samples().len(), guard.capacity());
        }
    }

    #[test]
    fn test_rms_sum_and_normalization() {
        let buf = RingBuffer::new(4);
        buf.write(&[3, -3, 4, -4]);
        assert_eq!(buf.rms(), 50.0);

        let full = RingBuffer::new(4);
        full.write(&[i16::MIN; 4]);
        let level = normalize_rms(full.rms(), 4, MAX_AMPLITUDE);
        assert!((level - 1.0).abs() < 1e-6);
        assert_eq!(normalize_rms(0.0, 0, MAX_AMPLITUDE), 0.0);
    }

    #[test]
    fn test_guard_blocks_writer_across_check_then_clear() {
        let buf = Arc::new(RingBuffer::new(4));
        buf.write(&[1, 2, 3, 4]);

        let written = Arc::new(AtomicBool::new(false));
        let mut guard = buf.acquire_lock();
        assert!(guard.is_dirty());

        let writer = {
            let buf = Arc::clone(&buf);
            let written = Arc::clone(&written);
            thread::spawn(move || {
                buf.write(&[9, 9, 9, 9]);
                written.store(true, Ordering::SeqCst);
            })
        };

        // The writer cannot slip in between the dirty check and the clear.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(guard.samples(), &[1, 2, 3, 4]);
        guard.clear_dirty();
        assert!(!written.load(Ordering::SeqCst));
        drop(guard);

        writer.join().unwrap();
        assert!(written.load(Ordering::SeqCst));
        let guard = buf.acquire_lock();
        assert!(guard.is_dirty());
        assert_eq!(guard.samples(), &[9, 9, 9, 9]);
    }

    #[test]
    fn test_concurrent_reads_never_tear() {
        let capacity = 256;
        let buf = Arc::new(RingBuffer::new(capacity));
        buf.write(&vec![0; capacity]);

        let writer = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                for value in 1..=2000i16 {
                    buf.write(&vec![value; capacity]);
                }
            })
        };

        for _ in 0..2000 {
            let mut guard = buf.acquire_lock();
            let first = guard.samples()[0];
            assert!(guard.samples().iter().all(|&s| s == first));
            guard.clear_dirty();
        }
        writer.join().unwrap();
        assert_eq!(buf.snapshot(), vec![2000; capacity]);
    }
}
