use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Create a linked cancel signal and token.
///
/// The signal is one-shot: the first `cancel` (or dropping the `Canceller`)
/// disconnects the channel, which every clone of the token observes.
pub fn cancel_pair() -> (Canceller, CancelToken) {
    let (tx, rx) = crossbeam_channel::bounded(0);
    (Canceller { tx: Some(tx) }, CancelToken { rx })
}

pub struct Canceller {
    tx: Option<Sender<()>>,
}

impl Canceller {
    /// Idempotent.
    pub fn cancel(&mut self) {
        self.tx.take();
    }
}

#[derive(Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Wait up to `dur`. Returns `true` if cancelled before or during the wait.
    pub fn sleep(&self, dur: Duration) -> bool {
        !matches!(self.rx.recv_timeout(dur), Err(RecvTimeoutError::Timeout))
    }

    /// Like `sleep`, saturating delays too long for a `Duration`.
    pub fn sleep_secs(&self, secs: f64) -> bool {
        let dur = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX);
        self.sleep(dur)
    }
}

/// Sleep for exact milliseconds, not interruptible.
pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}
