//! Per-key window state.

use serde::{Deserialize, Serialize};

/// Consumption state for one key within its current window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitEntry {
    /// The rate limit key (prefix plus client identity)
    pub key: String,
    /// Requests admitted in the current window
    pub count: u32,
    /// When the window expires, in epoch millis
    pub reset_at: u64,
}

impl RateLimitEntry {
    /// Start a new window for `key` with one admitted request.
    pub fn start(key: &str, now: u64, window_ms: u64) -> Self {
        Self {
            key: key.to_string(),
            count: 1,
            reset_at: now.saturating_add(window_ms),
        }
    }

    /// Whether the window has run out at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.reset_at
    }

    /// Remaining quota under `max_requests`.
    pub fn remaining(&self, max_requests: u32) -> u32 {
        max_requests.saturating_sub(self.count)
    }

    /// Whole seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self, now: u64) -> u64 {
        self.reset_at.saturating_sub(now).div_ceil(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_window() {
        let entry = RateLimitEntry::start("speech:anon:1.2.3.4", 10_000, 60_000);

        assert_eq!(entry.count, 1);
        assert_eq!(entry.reset_at, 70_000);
        assert_eq!(entry.remaining(3), 2);
    }

    #[test]
    fn test_expiry_is_inclusive_of_reset_time() {
        let entry = RateLimitEntry::start("k", 0, 1_000);

        assert!(!entry.is_expired(999));
        assert!(entry.is_expired(1_000));
        assert!(entry.is_expired(5_000));
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let entry = RateLimitEntry::start("k", 0, 60_000);

        assert_eq!(entry.retry_after_secs(15_000), 45);
        assert_eq!(entry.retry_after_secs(59_001), 1);
        assert_eq!(entry.retry_after_secs(59_999), 1);
        assert_eq!(entry.retry_after_secs(60_000), 0);
    }

    #[test]
    fn test_remaining_saturates() {
        let mut entry = RateLimitEntry::start("k", 0, 1_000);
        entry.count = 7;

        assert_eq!(entry.remaining(5), 0);
    }
}
