//! Memoization of token validation outcomes.
//!
//! The cache is injected into the validator rather than living in process
//! globals, so it can be bounded, swapped for another backend, or disabled.
//! It never changes an outcome, only how often one is recomputed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use moka::sync::Cache;

use crate::validator::{ReasonCode, Validation};

/// Default freshness window of a memoized outcome.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Default upper bound on memoized tokens.
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Longest TTL a [`BoundedValidationCache`] accepts; longer values are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A memoized validation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub is_valid: bool,
    pub reason: Option<ReasonCode>,
    /// When the outcome was computed.
    pub timestamp: DateTime<Utc>,
    /// Expiry of the token itself, when it decoded far enough to have one.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn new(validation: Validation, timestamp: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            is_valid: validation.is_valid,
            reason: validation.reason,
            timestamp,
            expires_at,
        }
    }

    pub fn validation(&self) -> Validation {
        Validation {
            is_valid: self.is_valid,
            reason: self.reason,
        }
    }

    /// Younger than `ttl` at `now`, and not a "valid" outcome for a token that
    /// has since expired.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        if now - self.timestamp >= ttl || now < self.timestamp {
            return false;
        }
        !(self.is_valid && self.expires_at.is_some_and(|exp| exp <= now))
    }
}

/// Storage for memoized outcomes, keyed by the raw token string.
pub trait ValidationCache: Send + Sync {
    fn get(&self, token: &str) -> Option<CacheEntry>;
    fn put(&self, token: &str, entry: CacheEntry);
    fn remove(&self, token: &str);
}

impl<C: ValidationCache + ?Sized> ValidationCache for Arc<C> {
    fn get(&self, token: &str) -> Option<CacheEntry> {
        (**self).get(token)
    }

    fn put(&self, token: &str, entry: CacheEntry) {
        (**self).put(token, entry)
    }

    fn remove(&self, token: &str) {
        (**self).remove(token)
    }
}

/// In-memory cache bounded by entry count, with a background-free TTL sweep.
///
/// Backed by Moka (TinyLFU admission, LRU eviction). Per-key operations are
/// atomic, so concurrent requests need no extra locking.
#[derive(Clone)]
pub struct BoundedValidationCache {
    inner: Cache<String, CacheEntry>,
}

impl BoundedValidationCache {
    /// `ttl` is clamped to [`MAX_TTL`].
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl.min(MAX_TTL))
                .build(),
        }
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for BoundedValidationCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }
}

impl core::fmt::Debug for BoundedValidationCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoundedValidationCache")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

impl ValidationCache for BoundedValidationCache {
    fn get(&self, token: &str) -> Option<CacheEntry> {
        self.inner.get(token)
    }

    fn put(&self, token: &str, entry: CacheEntry) {
        self.inner.insert(token.to_string(), entry);
    }

    fn remove(&self, token: &str) {
        self.inner.invalidate(token);
    }
}

/// Cache that never remembers anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidationCache;

impl ValidationCache for NoValidationCache {
    fn get(&self, _token: &str) -> Option<CacheEntry> {
        None
    }

    fn put(&self, _token: &str, _entry: CacheEntry) {}

    fn remove(&self, _token: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn valid_entry(timestamp: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> CacheEntry {
        CacheEntry::new(Validation::valid(), timestamp, expires_at)
    }

    #[test]
    fn freshness_follows_ttl() {
        let ttl = TimeDelta::seconds(30);
        let entry = valid_entry(at(0), None);
        assert!(entry.is_fresh(at(0), ttl));
        assert!(entry.is_fresh(at(29), ttl));
        assert!(!entry.is_fresh(at(30), ttl));
        assert!(!entry.is_fresh(at(-1), ttl));
    }

    #[test]
    fn valid_entry_goes_stale_when_token_expires() {
        let ttl = TimeDelta::seconds(30);
        let entry = valid_entry(at(0), Some(at(10)));
        assert!(entry.is_fresh(at(9), ttl));
        assert!(!entry.is_fresh(at(10), ttl));

        let invalid = CacheEntry::new(Validation::invalid(ReasonCode::TokenExpired), at(0), Some(at(-5)));
        assert!(invalid.is_fresh(at(10), ttl));
    }

    #[test]
    fn bounded_cache_round_trips_and_removes() {
        let cache = BoundedValidationCache::default();
        let entry = valid_entry(at(0), Some(at(60)));
        cache.put("tok", entry.clone());
        assert_eq!(cache.get("tok"), Some(entry));
        cache.remove("tok");
        assert_eq!(cache.get("tok"), None);
    }

    #[test]
    fn oversized_ttl_is_clamped() {
        let cache = BoundedValidationCache::new(16, Duration::from_secs(40_000_000_000));
        cache.put("tok", valid_entry(at(0), None));
        assert!(cache.get("tok").is_some());
    }

    #[test]
    fn disabled_cache_always_misses() {
        let cache = NoValidationCache;
        cache.put("tok", valid_entry(at(0), None));
        assert_eq!(cache.get("tok"), None);
    }

    #[test]
    fn shared_handle_sees_same_entries() {
        let cache = Arc::new(BoundedValidationCache::default());
        let other = Arc::clone(&cache);
        cache.put("tok", valid_entry(at(0), None));
        assert!(other.get("tok").is_some());
    }
}
