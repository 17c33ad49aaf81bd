// src/audio/source/stream_thread.rs
//! Dedicated thread that owns a callback-driven audio stream.
//!
//! Stream handles from the audio backends are not always `Send`, so they are
//! created, kept alive and dropped on one thread. The caller waits for a
//! bounded time until that thread reports the stream ready or failed.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::warn;

use crate::error::{Result, VizError};

/// How long a stream may take to report ready.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a thread keeping a stream alive until stopped.
pub(super) struct StreamThread {
    name: &'static str,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StreamThread {
    /// Run `setup` on a new thread and wait for its outcome.
    ///
    /// The value returned by `setup` stays alive on that thread until
    /// [`StreamThread::stop`]; dropping it there ends the stream.
    pub(super) fn spawn<F, G>(name: &'static str, setup: F) -> Result<Self>
    where
        F: FnOnce() -> Result<G> + Send + 'static,
        G: 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let stream = match setup() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Either a stop message or a dropped sender ends the wait.
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|source| VizError::Thread { name, source })?;

        let mut stream_thread = Self {
            name,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        };

        match ready_rx.recv_timeout(CONNECT_TIMEOUT) {
            Ok(Ok(())) => Ok(stream_thread),
            Ok(Err(e)) => {
                stream_thread.stop();
                Err(e)
            }
            Err(RecvTimeoutError::Timeout) => {
                // Still stuck in setup; the queued stop message ends it later.
                stream_thread.detach();
                Err(VizError::Timeout(CONNECT_TIMEOUT.as_millis()))
            }
            Err(RecvTimeoutError::Disconnected) => {
                stream_thread.stop();
                Err(VizError::Stream(format!("{name} thread exited during setup")))
            }
        }
    }

    /// Ask the thread to drop its stream and wait until it has.
    pub(super) fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(thread = self.name, "stream thread panicked");
            }
        }
    }

    fn detach(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        self.handle.take();
    }
}

impl Drop for StreamThread {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Flag(Arc<AtomicBool>);

    impl Drop for Flag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_stop_drops_stream_before_returning() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dropped);

        let mut stream_thread = StreamThread::spawn("test-stream", move || Ok(Flag(flag))).unwrap();
        assert!(!dropped.load(Ordering::SeqCst));

        stream_thread.stop();
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_setup_error_is_returned() {
        let result = StreamThread::spawn("test-stream", || -> Result<()> {
            Err(VizError::Connect("no server".into()))
        });
        assert!(matches!(result, Err(VizError::Connect(_))));
    }
}
