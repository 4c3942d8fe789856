//! Outbound UI surfaces and the wall clock.

use parley_common::Notification;

use crate::voice::RosterEntry;

/// Receives user-facing notices.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Receives the full participant list once per render pass.
pub trait RosterSink: Send + Sync {
    fn render(&self, entries: Vec<RosterEntry>);
}

/// Wall clock in epoch milliseconds; swapped out in tests.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
