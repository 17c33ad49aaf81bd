// src/error.rs
//! Error types shared by the capture pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while setting up sources, analyzers or the pipeline.
///
/// Nothing here is raised once a stream is running: short reads and
/// transient I/O failures are absorbed by the reader loops.
#[derive(Debug, Error)]
pub enum VizError {
    /// A FIFO, file or track could not be opened.
    #[error("unable to open audio source {}: {source}", .path.display())]
    OpenSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A track was opened but could not be decoded.
    #[error("unable to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    /// The audio server or its input device is unavailable.
    #[error("can't connect to audio server: {0}")]
    Connect(String),

    /// The capture or output stream could not be created.
    #[error("can't create audio stream: {0}")]
    Stream(String),

    /// The stream did not report ready in time.
    #[error("audio stream not ready after {0} ms")]
    Timeout(u128),

    /// FFT length the transform cannot be planned for.
    #[error("invalid FFT size {0} (must be at least 2)")]
    InvalidFftSize(usize),

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread could not be spawned.
    #[error("failed to spawn {name} thread: {source}")]
    Thread {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Shorthand result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, VizError>;
