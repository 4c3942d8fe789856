use std::time::{Duration, Instant};

use serde::Serialize;

/// Severity level for user-facing notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing notice produced by the voice and screenshare sessions.
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
    /// Whether the user can fix the problem by retrying the action.
    pub retryable: bool,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl Notification {
    /// Creates an info notification with a 5-second TTL.
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            body: body.into(),
            retryable: false,
            created_at: Instant::now(),
            ttl: Duration::from_secs(5),
        }
    }

    /// Creates a warning notification with an 8-second TTL.
    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            title: title.into(),
            body: body.into(),
            retryable: false,
            created_at: Instant::now(),
            ttl: Duration::from_secs(8),
        }
    }

    /// Creates an error notification with a 10-second TTL.
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            body: body.into(),
            retryable: false,
            created_at: Instant::now(),
            ttl: Duration::from_secs(10),
        }
    }

    /// Marks the notice as recoverable by retrying.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Returns `true` if this notification has exceeded its TTL.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_level_and_ttl() {
        let n = Notification::info("Voice", "Connected");
        assert_eq!(n.level, NotificationLevel::Info);
        assert_eq!(n.ttl, Duration::from_secs(5));

        let n = Notification::warning("Voice", "Poor connection");
        assert_eq!(n.level, NotificationLevel::Warning);
        assert_eq!(n.ttl, Duration::from_secs(8));

        let n = Notification::error("Voice", "Join failed");
        assert_eq!(n.level, NotificationLevel::Error);
        assert_eq!(n.ttl, Duration::from_secs(10));
    }

    #[test]
    fn retryable_flag() {
        let n = Notification::error("Screen share", "Connection lost");
        assert!(!n.retryable);
        assert!(n.retryable().retryable);
    }

    #[test]
    fn fresh_notification_is_not_expired() {
        let n = Notification::info("a", "b");
        assert!(!n.is_expired());
    }
}
