use std::cell::Cell;

use tokio::sync::Notify;

/// Non-blocking, non-queuing lock for the single-threaded feed.
///
/// `try_lock` fails immediately while held. Callers that need their work to
/// happen after an in-flight holder use `lock`, which waits for the release
/// and then competes again. The lock does not sequence anything by itself.
#[derive(Debug, Default)]
pub(crate) struct TryLock {
    held: Cell<bool>,
    released: Notify,
}

impl TryLock {
    pub(crate) fn try_lock(&self) -> Option<TryLockGuard<'_>> {
        if self.held.replace(true) {
            None
        } else {
            Some(TryLockGuard { lock: self })
        }
    }

    pub(crate) async fn lock(&self) -> TryLockGuard<'_> {
        loop {
            let released = self.released.notified();
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            released.await;
        }
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.held.get()
    }
}

/// Releases the lock when dropped, including on early return.
#[derive(Debug)]
pub(crate) struct TryLockGuard<'a> {
    lock: &'a TryLock,
}

impl Drop for TryLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.held.set(false);
        self.lock.released.notify_waiters();
    }
}
