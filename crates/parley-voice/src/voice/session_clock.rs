//! Start-time sanitization for the session elapsed-time display.

/// Pick the start time to display for a confirmed session.
///
/// - missing or in the future: `now`
/// - within `drift_window_ms` of `now` while this client has no prior start
///   and nobody else is in the channel: `now` (relay clock drift on a
///   session this client just created)
/// - otherwise the relay's value as-is
pub fn sanitize_started_at(
    started_at: Option<i64>,
    now: i64,
    prior_start: Option<i64>,
    remote_peers: usize,
    drift_window_ms: u64,
) -> i64 {
    let Some(started) = started_at else {
        return now;
    };
    if started > now {
        return now;
    }
    let age = now - started;
    let window = i64::try_from(drift_window_ms).unwrap_or(i64::MAX);
    if age < window && prior_start.is_none() && remote_peers == 0 {
        return now;
    }
    started
}

/// Whole seconds elapsed since `started_at_ms`, never negative.
pub fn elapsed_secs(started_at_ms: i64, now: i64) -> u64 {
    u64::try_from((now - started_at_ms) / 1000).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;
    const WINDOW: u64 = 120_000;

    #[test]
    fn recent_start_in_empty_channel_becomes_now() {
        assert_eq!(sanitize_started_at(Some(NOW - 50), NOW, None, 0, WINDOW), NOW);
    }

    #[test]
    fn old_start_is_kept() {
        let ten_min_ago = NOW - 10 * 60 * 1000;
        assert_eq!(
            sanitize_started_at(Some(ten_min_ago), NOW, None, 0, WINDOW),
            ten_min_ago
        );
    }

    #[test]
    fn future_start_is_clamped() {
        assert_eq!(sanitize_started_at(Some(NOW + 5_000), NOW, None, 3, WINDOW), NOW);
    }

    #[test]
    fn missing_start_is_now() {
        assert_eq!(sanitize_started_at(None, NOW, Some(NOW - 1), 2, WINDOW), NOW);
    }

    #[test]
    fn recent_start_kept_when_others_present() {
        assert_eq!(
            sanitize_started_at(Some(NOW - 50), NOW, None, 1, WINDOW),
            NOW - 50
        );
        assert_eq!(
            sanitize_started_at(Some(NOW - 50), NOW, Some(NOW - 50), 0, WINDOW),
            NOW - 50
        );
    }

    #[test]
    fn elapsed_never_negative() {
        assert_eq!(elapsed_secs(NOW, NOW + 2_500), 2);
        assert_eq!(elapsed_secs(NOW + 1_000, NOW), 0);
    }
}
