//! Core fixed-window rate limiter.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::entry::RateLimitEntry;
use super::policy::RateLimitPolicy;
use super::store::{MemoryStore, RateLimitStore};

/// Default time between sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    /// Whether the request was admitted
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the current window resets, in epoch millis
    pub reset_at: u64,
    /// Seconds to wait before retrying, set only on rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Store plus sweep bookkeeping, guarded by one lock.
struct LimiterState<S> {
    store: S,
    last_sweep: u64,
}

/// The rate limiter that tracks per-key request counts.
///
/// This struct is thread-safe and can be shared across tasks. Each check,
/// including any sweep it triggers, runs as one critical section, so
/// concurrent requests for the same key never lose an increment.
pub struct RateLimiter<S = MemoryStore, C = SystemClock> {
    state: Mutex<LimiterState<S>>,
    clock: C,
    sweep_interval_ms: u64,
}

impl RateLimiter {
    /// Create an in-memory rate limiter on the system clock.
    pub fn new() -> Self {
        Self::with_parts(MemoryStore::new(), SystemClock, DEFAULT_SWEEP_INTERVAL_MS)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RateLimitStore, C: Clock> RateLimiter<S, C> {
    /// Create a rate limiter from an explicit store, clock and sweep interval.
    pub fn with_parts(store: S, clock: C, sweep_interval_ms: u64) -> Self {
        let now = clock.now_millis();
        Self {
            state: Mutex::new(LimiterState {
                store,
                last_sweep: now,
            }),
            clock,
            sweep_interval_ms,
        }
    }

    /// Check and, if within quota, count a request for `key`.
    pub fn check(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        let now = self.clock.now_millis();

        trace!(
            key = %key,
            max_requests = policy.max_requests,
            window_ms = policy.window_ms,
            "Checking rate limit"
        );

        let mut state = self.state.lock();

        if now.saturating_sub(state.last_sweep) >= self.sweep_interval_ms {
            Self::sweep_locked(&mut state.store, now);
            state.last_sweep = now;
        }

        let entry = match state.store.get(key) {
            Some(entry) if !entry.is_expired(now) => entry,
            _ => {
                let entry = RateLimitEntry::start(key, now, policy.window_ms);
                debug!(
                    key = %key,
                    reset_at = entry.reset_at,
                    "Starting new rate limit window"
                );
                let decision = RateLimitDecision {
                    allowed: true,
                    remaining: entry.remaining(policy.max_requests),
                    reset_at: entry.reset_at,
                    retry_after: None,
                };
                state.store.set(key, entry);
                return decision;
            }
        };

        if entry.count >= policy.max_requests {
            let retry_after = entry.retry_after_secs(now);
            debug!(
                key = %key,
                count = entry.count,
                retry_after = retry_after,
                "Rate limit exceeded"
            );
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: entry.reset_at,
                retry_after: Some(retry_after),
            };
        }

        let entry = RateLimitEntry {
            count: entry.count + 1,
            ..entry
        };
        let decision = RateLimitDecision {
            allowed: true,
            remaining: entry.remaining(policy.max_requests),
            reset_at: entry.reset_at,
            retry_after: None,
        };
        state.store.set(key, entry);
        decision
    }

    /// Remove every expired entry now, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut state = self.state.lock();
        let removed = Self::sweep_locked(&mut state.store, now);
        state.last_sweep = now;
        removed
    }

    fn sweep_locked(store: &mut S, now: u64) -> usize {
        let expired: Vec<String> = store
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.to_string())
            .collect();

        for key in &expired {
            store.delete(key);
        }

        if !expired.is_empty() {
            debug!(
                removed = expired.len(),
                remaining = store.len(),
                "Swept expired rate limit entries"
            );
        }
        expired.len()
    }

    /// Get the current entry for a key, if one is stored.
    pub fn get_entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.state.lock().store.get(key)
    }

    /// Clear all entries.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.state.lock().store.clear();
    }

    /// Get the number of stored entries.
    pub fn entry_count(&self) -> usize {
        self.state.lock().store.len()
    }
}
