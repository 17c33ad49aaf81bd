// src/audio/channels.rs
//! The set of per-channel ring buffers shared by sources and the pipeline.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::buffer::RingBuffer;

/// One [`RingBuffer`] per audio channel behind a reader/writer lock.
///
/// Sources and the render thread take the read side and only contend on the
/// individual buffer mutexes. The pipeline takes the write side to add or
/// remove channels, which keeps the set from being observed half-changed.
pub struct ChannelBuffers {
    channels: RwLock<Vec<RingBuffer>>,
}

impl ChannelBuffers {
    /// Create `count` buffers of `capacity` samples each.
    pub fn new(count: usize, capacity: usize) -> Self {
        Self {
            channels: RwLock::new((0..count).map(|_| RingBuffer::new(capacity)).collect()),
        }
    }

    /// Shared access to the buffers.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<RingBuffer>> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access, used while the channel layout changes.
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<RingBuffer>> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distribute an interleaved PCM block over the channels.
    ///
    /// With two or more buffers the block is treated as stereo and split into
    /// the first two; otherwise it goes to the single buffer unchanged.
    pub fn write_interleaved(&self, samples: &[i16]) {
        let channels = self.read();
        match channels.as_slice() {
            [] => {}
            [mono] => mono.write(samples),
            [left, right, ..] => {
                left.write_strided(samples, 2, 0);
                right.write_strided(samples, 2, 1);
            }
        }
    }
}

/// Resize every buffer in `channels` and grow or shrink the set to `count`.
pub fn reconcile(channels: &mut Vec<RingBuffer>, count: usize, capacity: usize) {
    for buf in channels.iter() {
        buf.resize(capacity);
    }
    channels.truncate(count);
    while channels.len() < count {
        channels.push(RingBuffer::new(capacity));
    }
}
