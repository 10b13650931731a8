//! Time source used by the cache.
//!
//! Every freshness decision goes through a [`Clock`] so that reload cadence can
//! be driven deterministically in tests with [`ManualClock`].

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

pub type SharedClock = Arc<dyn Clock>;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        tokio::time::sleep(duration).boxed()
    }
}

/// Clock that only moves when told to. Sleeping advances the clock by the
/// requested duration immediately and records it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualClockState>>,
}

#[derive(Debug)]
struct ManualClockState {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            inner: Arc::new(Mutex::new(ManualClockState {
                now: start,
                sleeps: vec![],
            })),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.now = state.now + to_chrono(duration);
    }

    /// Durations requested through `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).sleeps.clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).now
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        async move {
            // Yield first, so a loop driven by this clock can be cancelled.
            tokio::task::yield_now().await;
            let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            state.sleeps.push(duration);
            state.now = state.now + to_chrono(duration);
        }
        .boxed()
    }
}

/// Saturating conversion, std durations beyond chrono's range are clamped.
pub fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Negative chrono durations (clock skew) become zero.
pub fn to_std(duration: chrono::Duration) -> Duration {
    duration.to_std().unwrap_or(Duration::ZERO)
}
