//! General utilities shared across the crate.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts a monotonic offset into the wall-clock Unix millis at which it began.
///
/// Listeners anchor their local clocks to this value, so it is derived from
/// the current wall clock minus the elapsed monotonic time rather than stored.
#[must_use]
pub fn wall_clock_start(elapsed: Duration) -> u64 {
    now_millis().saturating_sub(elapsed.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_start_is_in_the_past() {
        let now = now_millis();
        let start = wall_clock_start(Duration::from_secs(5));
        assert!(start <= now - 5_000 + 50);
        assert!(start >= now - 5_000 - 50);
    }

    #[test]
    fn wall_clock_start_saturates() {
        assert_eq!(wall_clock_start(Duration::from_secs(u64::MAX / 1_000_000)), 0);
    }
}
