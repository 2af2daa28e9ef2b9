//! Scheduling primitives for the single-threaded feed.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Enqueue `future` to run on a later scheduling turn of the current
/// `LocalSet`. Never runs any of it inline.
pub(crate) fn post<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    tokio::task::spawn_local(future)
}

/// Wait out a fixed settle interval.
pub(crate) async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
