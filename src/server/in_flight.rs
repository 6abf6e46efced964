//! In-Flight Request Tracking
//!
//! Counts requests that have been accepted but not yet answered. The accept
//! loop takes an [`InFlightGuard`] before handing a connection to the
//! handler; the count drops when the guard does, which covers success,
//! client errors and I/O failures alike.
//!
//! The shutdown watcher waits on [`InFlight::drained`] before it declares
//! the server terminated.

use std::sync::Arc;
use tokio::sync::watch;

/// A non-negative counter of in-flight requests.
#[derive(Debug)]
pub struct InFlight {
    count: watch::Sender<usize>,
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl InFlight {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self { count }
    }

    /// Marks a request as in flight until the returned guard is dropped.
    pub fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.send_modify(|n| *n += 1);
        InFlightGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Returns the number of requests currently in flight.
    pub fn current(&self) -> usize {
        *self.count.borrow()
    }

    /// Waits until no request is in flight.
    pub async fn drained(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    fn leave(&self) {
        self.count.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Keeps one request counted as in flight.
#[derive(Debug)]
#[must_use = "the request stops counting as in flight when the guard is dropped"]
pub struct InFlightGuard {
    tracker: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_guard_counts() {
        let in_flight = Arc::new(InFlight::new());
        assert_eq!(in_flight.current(), 0);

        let first = in_flight.enter();
        let second = in_flight.enter();
        assert_eq!(in_flight.current(), 2);

        drop(first);
        assert_eq!(in_flight.current(), 1);
        drop(second);
        assert_eq!(in_flight.current(), 0);
    }

    #[tokio::test]
    async fn test_drained_when_idle() {
        let in_flight = Arc::new(InFlight::new());
        timeout(Duration::from_millis(100), in_flight.drained())
            .await
            .expect("idle counter is already drained");
    }

    #[tokio::test]
    async fn test_drained_waits_for_guard() {
        let in_flight = Arc::new(InFlight::new());
        let guard = in_flight.enter();

        let waiter = {
            let in_flight = Arc::clone(&in_flight);
            tokio::spawn(async move { in_flight.drained().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("drained should complete once the guard drops")
            .unwrap();
    }

    #[tokio::test]
    async fn test_guard_released_on_panic() {
        let in_flight = Arc::new(InFlight::new());

        let task = {
            let in_flight = Arc::clone(&in_flight);
            tokio::spawn(async move {
                let _guard = in_flight.enter();
                panic!("handler failed");
            })
        };

        assert!(task.await.is_err());
        assert_eq!(in_flight.current(), 0);
    }
}
