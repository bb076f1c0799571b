//! Pause/cancel control for a running session.
//!
//! A single-slot `watch` channel carries the latest signal; the dial loop
//! reads it at number boundaries only, so an in-flight call always
//! finishes and gets recorded before a signal takes effect.

use tokio::sync::watch;

/// The control signal a session observes between dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Keep dialing
    Run,
    /// Park before the next candidate until the signal changes
    Pause,
    /// Finish the current call, finalize, stop
    Cancel,
}

/// Sender half held by whoever supervises the session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: watch::Sender<ControlSignal>,
}

impl SessionHandle {
    /// Park the session before its next dial.
    pub fn pause(&self) {
        self.send(ControlSignal::Pause);
    }

    /// Resume a paused session.
    pub fn resume(&self) {
        self.send(ControlSignal::Run);
    }

    /// Stop the session at the next number boundary.
    pub fn cancel(&self) {
        self.send(ControlSignal::Cancel);
    }

    fn send(&self, signal: ControlSignal) {
        if self.tx.send(signal).is_err() {
            tracing::debug!("Session already finished, {:?} ignored", signal);
        }
    }
}

/// Create a control channel pair. The receiver goes to the
/// [`crate::DialSession`]; the handle stays with the caller.
#[must_use]
pub fn control_channel() -> (SessionHandle, watch::Receiver<ControlSignal>) {
    let (tx, rx) = watch::channel(ControlSignal::Run);
    (SessionHandle { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_latest_signal_wins() {
        let (handle, rx) = control_channel();
        handle.pause();
        handle.cancel();
        assert_eq!(*rx.borrow(), ControlSignal::Cancel);
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_is_noop() {
        let (handle, rx) = control_channel();
        drop(rx);
        handle.cancel();
    }
}
