//! Per-client auth failure limiter.
//!
//! Sliding window per key (normally the peer IP): [`max_failures`] failed
//! attempts inside [`window_secs`] block the key for [`block_secs`].
//! A successful login calls [`RateLimiter::clear`].
//!
//! Storage is a fixed table of [`CAPACITY`] entries, no heap. When a new
//! key arrives and the table is full:
//!
//! 1. drop every entry whose block *and* window have both expired;
//! 2. if that freed nothing, overwrite the entry with the oldest first
//!    failure (first one wins on ties).
//!
//! Under heavy key churn an attacker's in-window count can be forgotten
//! this way; memory stays bounded regardless.
//!
//! # Synchronisation
//!
//! Methods take `&mut self` and there is no internal lock. The auth
//! handler owns the limiter; a multi-threaded server wraps it in its own
//! `Mutex`.
//!
//! [`max_failures`]: crate::config::RateLimitConfig::max_failures
//! [`window_secs`]: crate::config::RateLimitConfig::window_secs
//! [`block_secs`]: crate::config::RateLimitConfig::block_secs

use heapless::{String, Vec};
use log::{debug, warn};

use crate::adapters::time::MonotonicClock;
use crate::app::ports::Clock;
use crate::config::RateLimitConfig;

/// Table slots.
pub const CAPACITY: usize = 16;
/// Longest stored key in bytes; longer keys are cut at a char boundary.
pub const MAX_KEY_LEN: usize = 63;

type Key = String<64>;

#[derive(Debug, Clone)]
struct Entry {
    key: Key,
    failures: u32,
    first_failure_ms: u64,
    blocked_until_ms: u64,
}

impl Entry {
    fn new(key: Key) -> Self {
        Self {
            key,
            failures: 0,
            first_failure_ms: 0,
            blocked_until_ms: 0,
        }
    }

    fn block_active(&self, now: u64) -> bool {
        self.blocked_until_ms > now
    }

    fn window_expired(&self, now: u64, window_ms: u64) -> bool {
        now.saturating_sub(self.first_failure_ms) > window_ms
    }
}

/// Normalise `key` to what the table stores.
fn stored_key(key: &str) -> Key {
    let mut end = key.len().min(MAX_KEY_LEN);
    while !key.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = Key::new();
    // end <= MAX_KEY_LEN < capacity
    let _ = out.push_str(&key[..end]);
    out
}

pub struct RateLimiter<C: Clock = MonotonicClock> {
    entries: Vec<Entry, CAPACITY>,
    config: RateLimitConfig,
    clock: C,
}

impl RateLimiter<MonotonicClock> {
    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default(), MonotonicClock::new())
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(config: RateLimitConfig, clock: C) -> Self {
        Self {
            entries: Vec::new(),
            config,
            clock,
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        let key = stored_key(key);
        self.entries.iter().position(|e| e.key == key)
    }

    /// Drop entries with neither an active block nor a live window.
    fn purge_expired(&mut self, now: u64) {
        let window_ms = self.config.window_ms();
        let before = self.entries.len();
        self.entries.retain(|e| {
            e.block_active(now) || (e.failures > 0 && !e.window_expired(now, window_ms))
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("rate limit: cleanup removed {removed} expired entries");
        }
    }

    fn find_or_create(&mut self, key: &str, now: u64) -> usize {
        if let Some(i) = self.position(key) {
            return i;
        }
        let key = stored_key(key);

        if self.entries.is_full() {
            self.purge_expired(now);
        }
        if !self.entries.is_full() {
            let i = self.entries.len();
            // Not full, checked above.
            let _ = self.entries.push(Entry::new(key));
            return i;
        }

        // Still full: evict the oldest first failure. The table is nonempty
        // here because CAPACITY > 0.
        let oldest = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.first_failure_ms)
            .map_or(0, |(i, _)| i);
        debug!(
            "rate limit: table full, evicting '{}'",
            self.entries[oldest].key
        );
        self.entries[oldest] = Entry::new(key);
        oldest
    }

    /// Count one failed attempt from `key`.
    pub fn record_failure(&mut self, key: &str) {
        let now = self.clock.now_ms();
        let window_ms = self.config.window_ms();
        let i = self.find_or_create(key, now);
        let entry = &mut self.entries[i];

        if entry.failures > 0 && entry.window_expired(now, window_ms) {
            entry.failures = 0;
        }
        if entry.failures == 0 {
            entry.first_failure_ms = now;
        }
        entry.failures = entry.failures.saturating_add(1);

        if entry.failures >= u32::from(self.config.max_failures) {
            entry.blocked_until_ms = now + self.config.block_ms();
            warn!(
                "rate limit: '{}' blocked for {}s after {} auth failures",
                entry.key, self.config.block_secs, entry.failures
            );
        }
    }

    /// `true` while `key` is inside a block. Lazily resets an entry whose
    /// block and window have both run out.
    pub fn is_blocked(&mut self, key: &str) -> bool {
        let Some(i) = self.position(key) else {
            return false;
        };
        let now = self.clock.now_ms();
        let window_ms = self.config.window_ms();
        let entry = &mut self.entries[i];

        if entry.block_active(now) {
            return true;
        }
        if entry.window_expired(now, window_ms) {
            entry.failures = 0;
            entry.blocked_until_ms = 0;
        }
        false
    }

    /// Forget failures and any block for `key` (successful login).
    pub fn clear(&mut self, key: &str) {
        if let Some(i) = self.position(key) {
            let entry = &mut self.entries[i];
            entry.failures = 0;
            entry.blocked_until_ms = 0;
        }
    }

    /// Failures counted in the current window (0 for unknown keys).
    pub fn failure_count(&self, key: &str) -> u32 {
        self.position(key).map_or(0, |i| self.entries[i].failures)
    }

    /// Occupied slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        CAPACITY
    }
}
