//! Wake-up Channel
//!
//! Level-triggered notifier shared by the sampler and blocked consumers.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// A wait ended because its interruption fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wait interrupted")]
pub struct Interrupted;

/// Wakes every registered waiter when a sample has been published
#[derive(Debug, Default)]
pub struct WakeChannel {
    notify: Notify,
}

/// An armed interest in the next `signal()`.
///
/// A signal issued at any time after `register()` returns completes this
/// registration, even if it has not been awaited yet.
pub struct Registration<'a> {
    notified: Pin<Box<Notified<'a>>>,
}

impl Registration<'_> {
    /// Wait for the signal this registration is armed for
    pub async fn wait(self) {
        self.notified.await
    }
}

impl WakeChannel {
    /// Create a new channel with no waiters
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake all currently registered waiters
    pub fn signal(&self) {
        self.notify.notify_waiters();
    }

    /// Register the caller for the next signal
    pub fn register(&self) -> Registration<'_> {
        let mut notified = Box::pin(self.notify.notified());
        notified.as_mut().enable();
        Registration { notified }
    }

    /// Block until `ready` yields a value or `interrupted` completes.
    ///
    /// The caller is registered before every evaluation of `ready`, so a
    /// signal racing with the check cannot be lost. Spurious wake-ups just
    /// re-evaluate `ready`.
    pub async fn wait<T, F, I>(&self, mut ready: F, interrupted: I) -> Result<T, Interrupted>
    where
        F: FnMut() -> Option<T>,
        I: Future<Output = ()>,
    {
        tokio::pin!(interrupted);
        loop {
            let registration = self.register();
            if let Some(value) = ready() {
                return Ok(value);
            }

            tokio::select! {
                _ = registration.wait() => {}
                _ = &mut interrupted => return Err(Interrupted),
            }
        }
    }
}
