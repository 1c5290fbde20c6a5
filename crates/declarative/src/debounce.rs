//! Debounced query gate
//!
//! Rapid input (one call per keystroke) is coalesced into a single search
//! once the input has been quiet for an interval. Only the latest text is
//! ever searched.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Quiet period before a search fires
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(300);

/// Coalesces bursts of input into one callback
///
/// The callback runs on the gate's own thread, so a slow search never blocks
/// the caller of [`on_input`](Self::on_input). Dropping the gate discards any
/// pending input.
pub struct DebouncedGate {
    tx: Sender<String>,
}

impl DebouncedGate {
    /// Start a gate that calls `on_fire` with the latest text after
    /// `interval` of quiet
    pub fn new<F>(interval: Duration, mut on_fire: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<String>();

        thread::spawn(move || {
            while let Ok(mut pending) = rx.recv() {
                loop {
                    match rx.recv_timeout(interval) {
                        Ok(newer) => pending = newer,
                        Err(RecvTimeoutError::Timeout) => {
                            on_fire(pending);
                            break;
                        }
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            }
        });

        Self { tx }
    }

    /// Record new input, restarting the quiet period
    pub fn on_input(&self, text: impl Into<String>) {
        // Only fails if the gate thread is gone (callback panicked).
        if self.tx.send(text.into()).is_err() {
            log::debug!("Debounce thread has stopped; input dropped");
        }
    }
}
