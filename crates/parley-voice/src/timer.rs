//! Cancellable one-shot and repeating timers.
//!
//! A timer is a spawned task that posts an event into the owner's inbox.
//! Cancelling aborts the task; an event already queued before the abort
//! still arrives, so handlers re-check their state before acting.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Shortest repeat period; `interval_at` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
pub struct Timer {
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Fire `event` once after `delay`, replacing any pending schedule.
    pub fn schedule<T>(&mut self, delay: Duration, tx: mpsc::UnboundedSender<T>, event: T)
    where
        T: Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        }));
    }

    /// Fire `event` every `period`, first after one full period.
    pub fn repeat<T>(&mut self, period: Duration, tx: mpsc::UnboundedSender<T>, event: T)
    where
        T: Clone + Send + 'static,
    {
        self.cancel();
        let period = period.max(MIN_PERIOD);
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(event.clone()).is_err() {
                    break;
                }
            }
        }));
    }

    /// Stop the timer. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether a schedule is pending or repeating.
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}
