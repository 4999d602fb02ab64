//! Keyed registry of token buckets.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::bucket::TokenBucket;
use super::clock::{Clock, SystemClock};
use super::key::{KeyExtractor, KeyStrategy};

/// Requests per second used when the configured value is not positive.
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 100;
/// Burst multiplier used when the configured burst is not positive.
pub const DEFAULT_BURST_MULTIPLIER: u32 = 2;

/// Immutable rate limiting settings for one registry.
#[derive(Clone)]
pub struct RateLimitConfig {
    requests_per_second: u32,
    burst_size: u32,
    extractor: Arc<dyn KeyExtractor>,
}

impl RateLimitConfig {
    /// Build a configuration, replacing non-positive values with defaults.
    ///
    /// A non-positive rate becomes [`DEFAULT_REQUESTS_PER_SECOND`]; a
    /// non-positive burst becomes twice the (possibly defaulted) rate.
    pub fn new(requests_per_second: i64, burst_size: i64, extractor: Arc<dyn KeyExtractor>) -> Self {
        let requests_per_second =
            positive_u32(requests_per_second).unwrap_or(DEFAULT_REQUESTS_PER_SECOND);
        let burst_size = positive_u32(burst_size)
            .unwrap_or_else(|| requests_per_second.saturating_mul(DEFAULT_BURST_MULTIPLIER));

        Self {
            requests_per_second,
            burst_size,
            extractor,
        }
    }

    /// Configuration using one of the built-in strategies.
    pub fn with_strategy(requests_per_second: i64, burst_size: i64, strategy: KeyStrategy) -> Self {
        Self::new(requests_per_second, burst_size, Arc::new(strategy))
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }

    pub fn burst_size(&self) -> u32 {
        self.burst_size
    }

    pub fn extractor(&self) -> &dyn KeyExtractor {
        self.extractor.as_ref()
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::with_strategy(0, 0, KeyStrategy::Global)
    }
}

impl fmt::Debug for RateLimitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitConfig")
            .field("requests_per_second", &self.requests_per_second)
            .field("burst_size", &self.burst_size)
            .finish_non_exhaustive()
    }
}

fn positive_u32(value: i64) -> Option<u32> {
    if value > 0 {
        Some(u32::try_from(value).unwrap_or(u32::MAX))
    } else {
        None
    }
}

/// Owns one [`TokenBucket`] per rate-limit key.
///
/// Buckets are created on first use of a key and live as long as the
/// registry; there is no eviction. Lookups of existing keys take the shared
/// lock only. The exclusive lock is taken for the first sighting of a key and
/// the map is re-checked under it, so concurrent first use of the same key
/// constructs exactly one bucket.
pub struct LimiterRegistry {
    /// Buckets indexed by rate-limit key
    limiters: RwLock<HashMap<String, Arc<TokenBucket>>>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl LimiterRegistry {
    /// Create a registry driven by the system clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a registry driven by `clock`.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            limiters: RwLock::new(HashMap::new()),
            config,
            clock,
        }
    }

    /// Return the bucket for `key`, creating it if this is the first use.
    pub fn get_or_create(&self, key: &str) -> Arc<TokenBucket> {
        if let Some(limiter) = self.limiters.read().get(key) {
            return Arc::clone(limiter);
        }

        let mut limiters = self.limiters.write();
        // Another caller may have inserted the key between the two locks.
        if let Some(limiter) = limiters.get(key) {
            return Arc::clone(limiter);
        }

        debug!(
            key = %key,
            requests_per_second = self.config.requests_per_second,
            burst_size = self.config.burst_size,
            "Creating new rate limiter"
        );

        let limiter = Arc::new(TokenBucket::new(
            self.config.requests_per_second,
            self.config.burst_size,
            self.clock.now(),
        ));
        limiters.insert(key.to_string(), Arc::clone(&limiter));
        limiter
    }

    /// Take one token from the bucket for `key`.
    pub fn try_acquire(&self, key: &str) -> bool {
        let limiter = self.get_or_create(key);
        limiter.try_acquire(self.clock.now())
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Get the number of keys seen so far.
    pub fn len(&self) -> usize {
        self.limiters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for LimiterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimiterRegistry")
            .field("config", &self.config)
            .field("keys", &self.len())
            .finish()
    }
}
