//! Cooperative cancellation shared between the Ctrl-C handler and the poll
//! loop.

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// A flag that can be raised once from any thread and observed, or waited on,
/// from any other.
///
/// Clones share the same flag. Waiting with [`wait_timeout`] returns as soon as
/// the flag is raised, which is how the poll loop's pause gets cut short.
///
/// ```
/// use std::{thread, time::Duration};
/// use serialmon::CancellationToken;
///
/// let token = CancellationToken::new();
/// let remote = token.clone();
/// thread::spawn(move || remote.cancel());
/// assert!(token.wait_timeout(Duration::from_secs(5)));
/// ```
///
/// [`wait_timeout`]: CancellationToken::wait_timeout
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}
impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake up every waiter. Idempotent.
    pub fn cancel(&self) {
        let (_, wakeup) = &*self.inner;
        *self.flag() = true;
        wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag()
    }

    /// Block for at most `timeout`, returning early if the flag is raised.
    ///
    /// Returns `true` when the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (_, wakeup) = &*self.inner;
        let (cancelled, _) = wakeup
            .wait_timeout_while(self.flag(), timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled
    }

    // The flag is a plain bool, a panic while holding the lock cannot leave it
    // half-updated.
    fn flag(&self) -> MutexGuard<'_, bool> {
        let (lock, _) = &*self.inner;
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn starts_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
}

#[test]
fn cancel_is_seen_by_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();
    clone.cancel();
    assert!(token.is_cancelled());
    // Cancelling twice is harmless.
    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn wait_times_out_when_not_cancelled() {
    use std::time::Instant;

    let token = CancellationToken::new();
    let started = Instant::now();
    assert!(!token.wait_timeout(Duration::from_millis(20)));
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[test]
fn wait_returns_immediately_once_cancelled() {
    let token = CancellationToken::new();
    token.cancel();
    assert!(token.wait_timeout(Duration::from_secs(60)));
}

#[test]
fn wait_is_cut_short_by_another_thread() {
    use std::{thread, time::Instant};

    let token = CancellationToken::new();
    let remote = token.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        remote.cancel();
    });

    let started = Instant::now();
    assert!(token.wait_timeout(Duration::from_secs(60)));
    assert!(started.elapsed() < Duration::from_secs(30));
    canceller.join().unwrap();
}
