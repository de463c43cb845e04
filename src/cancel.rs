//! Cooperative cancellation for delivery sessions.
//!
//! A [`CancelToken`] is handed to [`Subscriber::subscribe`] so a subscription
//! can be stopped deterministically (for example from a Ctrl-C handler) rather
//! than only by a broker-side fatal error. Tokens are cheap to clone; all
//! clones observe the same cancellation.
//!
//! [`Subscriber::subscribe`]: crate::remote::Subscriber::subscribe

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every waiter. Idempotent.
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .expect("cancel mutex poisoned");
        *cancelled = true;
        self.inner.cond.notify_all();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .expect("cancel mutex poisoned")
    }

    /// Block until cancelled or until `timeout` elapses. Returns whether the
    /// token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let cancelled = self
            .inner
            .cancelled
            .lock()
            .expect("cancel mutex poisoned");
        let (cancelled, _) = self
            .inner
            .cond
            .wait_timeout_while(cancelled, timeout, |cancelled| !*cancelled)
            .expect("cancel mutex poisoned");
        *cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cancel_is_visible_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_wait_timeout_wakes_on_cancel() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || token.wait_timeout(Duration::from_secs(10)))
        };
        token.cancel();
        assert!(waiter.join().expect("waiter panicked"));
    }

    #[test]
    fn test_wait_timeout_expires_without_cancel() {
        let token = CancelToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(10)));
    }
}
