// Queue Stop Token

use tokio::sync::watch;

/// Cancellation signal observed by the drain loop
#[derive(Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

impl StopToken {
    /// Check if a stop was requested
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Stop sender held by the cancelling control path
pub struct StopSender {
    tx: watch::Sender<bool>,
}

impl StopSender {
    /// Signal the drain loop to stop
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a stop channel
pub fn stop_channel() -> (StopSender, StopToken) {
    let (tx, rx) = watch::channel(false);
    (StopSender { tx }, StopToken { rx })
}
