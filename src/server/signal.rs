//! One-Shot Broadcast Signals
//!
//! A [`Signal`] goes from "open" to "fired" exactly once. Any number of
//! [`SignalListener`]s can wait for it, and waiting never consumes the fire
//! event: a listener created after the signal fired returns immediately.
//!
//! The server uses three of them: shutdown (fired by the caller), listener
//! closed (fired by the accept loop) and termination (fired by the shutdown
//! watcher once everything has drained).
//!
//! Dropping a `Signal` without firing it also releases its listeners, so a
//! task waiting on a signal whose owner went away does not hang forever.

use tokio::sync::watch;

/// The firing side of a one-shot broadcast signal.
#[derive(Debug)]
pub struct Signal {
    tx: watch::Sender<bool>,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    /// Creates a signal in the "open" state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Fires the signal.
    ///
    /// Returns `true` if this call fired it, `false` if it had already fired.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    /// Returns true once the signal has fired.
    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Creates a listener for this signal.
    pub fn listener(&self) -> SignalListener {
        SignalListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// The waiting side of a one-shot broadcast signal.
#[derive(Debug, Clone)]
pub struct SignalListener {
    rx: watch::Receiver<bool>,
}

impl SignalListener {
    /// Waits until the signal fires, or until its `Signal` is dropped.
    ///
    /// Cancel safe: dropping the future and calling `fired` again still
    /// observes a fire that happened in between.
    pub async fn fired(&mut self) {
        // An error means the sender is gone, which releases waiters too.
        let _ = self.rx.wait_for(|fired| *fired).await;
    }

    /// Returns true if the signal has fired.
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }
}
