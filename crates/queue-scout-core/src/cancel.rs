//! # Cooperative Cancellation
//!
//! Cancellation flag shared between a caller and in-flight connect or
//! refresh work. Built on a watch channel so waiters can await the flip
//! instead of polling.

use std::sync::Arc;
use tokio::sync::watch;

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;

/// Handle for cancelling in-flight connect and refresh work
///
/// Clones share one flag; cancelling any clone cancels them all. The flag is
/// sticky: once set it never clears, so late waiters return immediately.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a new, uncancelled token
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            flag: Arc::new(sender),
        }
    }

    /// Set the flag and wake every waiter
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    /// Check the flag without waiting
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Wait until the flag is set
    ///
    /// Returns immediately when the token is already cancelled.
    pub async fn cancelled(&self) {
        let mut waiter = self.flag.subscribe();
        while !*waiter.borrow_and_update() {
            // The sender lives inside `self`, so `changed` cannot fail here.
            if waiter.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
