//! [`BusyLifecycle`]: gates operations against shutdown and drains workers
//! on stop (spec.md §4.1).

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::{IgfsError, Result};

const RUNNING: u8 = 0;
const BLOCKING: u8 = 1;
const BLOCKED: u8 = 2;

/// A guard returned by [`BusyLifecycle::enter`]; dropping it (or calling
/// [`BusyGuard::leave`] explicitly) pairs with every exit path of the
/// wrapped operation, mirroring the teacher's close-once stream guards.
pub struct BusyGuard<'a> {
    lifecycle: &'a BusyLifecycle,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.lifecycle.drain_notify.notify_waiters();
    }
}

/// Gates every public operation against shutdown. States form the chain
/// `running -> blocking -> blocked`; once `block()` starts, `enter()`
/// permanently fails.
pub struct BusyLifecycle {
    state: AtomicU8,
    in_flight: std::sync::atomic::AtomicUsize,
    drain_notify: Notify,
    ready_wait: Duration,
}

impl BusyLifecycle {
    pub fn new() -> Self {
        Self::with_ready_wait(Duration::from_secs(30))
    }

    pub fn with_ready_wait(ready_wait: Duration) -> Self {
        Self {
            state: AtomicU8::new(RUNNING),
            in_flight: std::sync::atomic::AtomicUsize::new(0),
            drain_notify: Notify::new(),
            ready_wait,
        }
    }

    /// Awaits readiness of the metadata/data managers (bounded), then
    /// admits the caller into the busy section iff still `running`.
    pub async fn enter<'a, F>(&'a self, await_ready: F) -> Result<BusyGuard<'a>>
    where
        F: Future<Output = Result<()>>,
    {
        match tokio::time::timeout(self.ready_wait, await_ready).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(IgfsError::IllegalState(
                    "metadata/data managers did not become ready in time".into(),
                ))
            }
        }

        if self.state.load(Ordering::Acquire) != RUNNING {
            return Err(IgfsError::IllegalState("igfs is shutting down".into()));
        }

        self.in_flight.fetch_add(1, Ordering::AcqRel);
        // Re-check after registering: a block() that raced us to BLOCKING
        // between the load above and the fetch_add must still see us and
        // wait, but if it already finished transitioning we must bail.
        if self.state.load(Ordering::Acquire) == BLOCKED {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return Err(IgfsError::IllegalState("igfs is shutting down".into()));
        }

        Ok(BusyGuard { lifecycle: self })
    }

    /// Transitions to `blocking`, waits for in-flight operations to
    /// leave, cancels and joins `drain`'s workers, then transitions to
    /// `blocked`. `drain` itself is responsible for cancelling and
    /// joining worker tasks (see [`crate::writer_registry::WriterRegistry::shutdown`]);
    /// this only sequences it against the busy-section barrier.
    pub async fn block<D, Fut>(&self, drain: D)
    where
        D: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        self.state.store(BLOCKING, Ordering::Release);
        debug!("busy lifecycle entering blocking state");

        while self.in_flight.load(Ordering::Acquire) > 0 {
            self.drain_notify.notified().await;
        }

        drain().await;

        self.state.store(BLOCKED, Ordering::Release);
        warn!("busy lifecycle drained and blocked; no further operations will be admitted");
    }

    pub fn is_blocked(&self) -> bool {
        self.state.load(Ordering::Acquire) == BLOCKED
    }
}

impl Default for BusyLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience for collaborators that are always ready.
pub async fn always_ready() -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn enter_succeeds_while_running() {
        let lifecycle = BusyLifecycle::new();
        let guard = lifecycle.enter(always_ready()).await;
        assert!(guard.is_ok());
    }

    #[tokio::test]
    async fn enter_fails_after_block() {
        let lifecycle = BusyLifecycle::new();
        lifecycle.block(|| async {}).await;
        let result = lifecycle.enter(always_ready()).await;
        assert!(matches!(result, Err(IgfsError::IllegalState(_))));
    }

    #[tokio::test]
    async fn block_waits_for_in_flight_guard_to_drop() {
        let lifecycle = Arc::new(BusyLifecycle::new());
        let guard = lifecycle.enter(always_ready()).await.unwrap();

        let lifecycle2 = lifecycle.clone();
        let blocker = tokio::spawn(async move {
            lifecycle2.block(|| async {}).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!blocker.is_finished());
        drop(guard);
        blocker.await.unwrap();
        assert!(lifecycle.is_blocked());
    }

    #[tokio::test]
    async fn enter_fails_on_ready_timeout() {
        let lifecycle = BusyLifecycle::with_ready_wait(Duration::from_millis(10));
        let never_ready = std::future::pending::<Result<()>>();
        let result = lifecycle.enter(never_ready).await;
        assert!(matches!(result, Err(IgfsError::IllegalState(_))));
    }
}
