// Adapted from the Pants project's `async_latch` crate (Apache License, Version 2.0).

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

/// A condition that can be triggered once to release any tasks waiting for it.
/// Equivalent to Java's `CountDownLatch` with a count of 1.
///
/// Used as each node's completion barrier: the coordinator registers one per
/// decoded node and triggers it once every instance of that node has applied.
#[derive(Clone)]
pub struct AsyncLatch {
    sender: Arc<Mutex<Option<watch::Sender<()>>>>,
    receiver: watch::Receiver<()>,
}

impl AsyncLatch {
    pub fn new() -> AsyncLatch {
        let (sender, receiver) = watch::channel(());
        AsyncLatch {
            sender: Arc::new(Mutex::new(Some(sender))),
            receiver,
        }
    }

    /// Marks this latch triggered. Calls after the first are no-ops.
    pub fn trigger(&self) {
        self.sender.lock().take();
    }

    /// Waits for another task to trigger this latch.
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        while receiver.changed().await.is_ok() {}
    }
}

impl Default for AsyncLatch {
    fn default() -> Self {
        Self::new()
    }
}
