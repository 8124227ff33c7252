//! Run-scoped coordination primitives
//!
//! Each signal has exactly one owner that can raise it, and raising consumes the owner,
//! so a signal can never be raised twice. Observers are cheap clones.

use crate::capsule::Capsule;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

/// Receiving end of a queue shared by several workers
pub type SharedReceiver<T = Capsule> = Arc<Mutex<mpsc::Receiver<T>>>;

pub fn shared<T>(receiver: mpsc::Receiver<T>) -> SharedReceiver<T> {
    Arc::new(Mutex::new(receiver))
}

/// The single handle able to raise `kill`
#[derive(Debug)]
pub struct KillSwitch {
    token: CancellationToken,
}

impl KillSwitch {
    pub fn new() -> (Self, KillSignal) {
        let token = CancellationToken::new();
        let signal = KillSignal {
            token: token.clone(),
        };
        (Self { token }, signal)
    }

    /// Broadcast cancellation to every observer
    pub fn fire(self) {
        self.token.cancel();
    }
}

/// Observer side of `kill`
#[derive(Debug, Clone)]
pub struct KillSignal {
    token: CancellationToken,
}

impl KillSignal {
    pub fn is_raised(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `kill` has been raised
    pub async fn raised(&self) {
        self.token.cancelled().await
    }
}

/// Completion notice raised by the sink worker once everything it received is flushed
#[derive(Debug)]
pub struct CompletionNotice {
    sender: oneshot::Sender<()>,
}

impl CompletionNotice {
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    pub fn raise(self) {
        // the receiver is gone once join has returned; nobody is left to notify
        let _ = self.sender.send(());
    }
}
