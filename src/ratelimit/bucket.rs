//! Token bucket limiter.

use std::time::Instant;

use parking_lot::Mutex;

/// Token counts are tracked in billionths of a token so that refill over a
/// nanosecond-resolution interval is exact integer arithmetic.
const NANOS_PER_TOKEN: u128 = 1_000_000_000;

/// A token bucket rate limiter.
///
/// Tokens accumulate at `rate` per second up to `burst`, starting full. Each
/// admitted call consumes exactly one token; a call that finds the bucket empty
/// is rejected immediately and consumes nothing.
///
/// The bucket is shared by every caller that maps to the same key, so the
/// refill-and-take step runs under a per-bucket mutex. The critical section is
/// a handful of integer operations and never waits for tokens.
#[derive(Debug)]
pub struct TokenBucket {
    /// Refill rate in tokens per second
    rate: u32,
    /// Maximum number of tokens the bucket holds
    burst: u32,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    /// Available tokens, in billionths of a token
    nano_tokens: u128,
    /// Instant the refill was last computed
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(rate: u32, burst: u32, now: Instant) -> Self {
        Self {
            rate,
            burst,
            state: Mutex::new(BucketState {
                nano_tokens: burst as u128 * NANOS_PER_TOKEN,
                last_refill: now,
            }),
        }
    }

    /// Try to take one token at `now`.
    ///
    /// Returns `true` if a token was available and has been consumed.
    pub fn try_acquire(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state, now);

        if state.nano_tokens >= NANOS_PER_TOKEN {
            state.nano_tokens -= NANOS_PER_TOKEN;
            true
        } else {
            false
        }
    }

    /// Refill rate in tokens per second.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Bucket capacity.
    pub fn burst(&self) -> u32 {
        self.burst
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        // An instant earlier than the last refill adds nothing.
        let elapsed = now.saturating_duration_since(state.last_refill);
        let capacity = self.burst as u128 * NANOS_PER_TOKEN;

        // elapsed_ns * rate is exactly the refill in nano-tokens.
        let refill = elapsed.as_nanos().saturating_mul(self.rate as u128);
        state.nano_tokens = state.nano_tokens.saturating_add(refill).min(capacity);
        if now > state.last_refill {
            state.last_refill = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_full_bucket_admits_exactly_burst() {
        let start = Instant::now();
        let bucket = TokenBucket::new(10, 5, start);

        for _ in 0..5 {
            assert!(bucket.try_acquire(start));
        }

        // The 6th call at the same instant must be rejected
        assert!(!bucket.try_acquire(start));
    }

    #[test]
    fn test_rejection_consumes_nothing() {
        let start = Instant::now();
        let bucket = TokenBucket::new(1, 1, start);

        assert!(bucket.try_acquire(start));
        assert!(!bucket.try_acquire(start));
        assert!(!bucket.try_acquire(start));

        // One second later exactly one token is back, not less
        assert!(bucket.try_acquire(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_one_token_per_interval() {
        let start = Instant::now();
        let bucket = TokenBucket::new(4, 4, start);

        for _ in 0..4 {
            assert!(bucket.try_acquire(start));
        }
        assert!(!bucket.try_acquire(start));

        let later = start + Duration::from_millis(250);
        assert!(bucket.try_acquire(later));
        assert!(!bucket.try_acquire(later));
    }

    #[test]
    fn test_partial_interval_does_not_refill_a_token() {
        let start = Instant::now();
        let bucket = TokenBucket::new(2, 2, start);

        assert!(bucket.try_acquire(start));
        assert!(bucket.try_acquire(start));

        let t1 = start + Duration::from_millis(300);
        assert!(!bucket.try_acquire(t1));

        // Fractional progress is kept: 300ms + 200ms is a full token at 2/s
        let t2 = start + Duration::from_millis(500);
        assert!(bucket.try_acquire(t2));
    }

    #[test]
    fn test_refill_is_clamped_to_burst() {
        let start = Instant::now();
        let bucket = TokenBucket::new(5, 3, start);

        for _ in 0..3 {
            assert!(bucket.try_acquire(start));
        }

        let much_later = start + Duration::from_secs(3600 * 24 * 365);
        for _ in 0..3 {
            assert!(bucket.try_acquire(much_later));
        }
        assert!(!bucket.try_acquire(much_later));
    }

    #[test]
    fn test_full_refill_after_burst_over_rate() {
        let start = Instant::now();
        let bucket = TokenBucket::new(2, 4, start);

        for _ in 0..4 {
            assert!(bucket.try_acquire(start));
        }
        assert!(!bucket.try_acquire(start));

        let refilled = start + Duration::from_secs(2);
        for _ in 0..4 {
            assert!(bucket.try_acquire(refilled));
        }
        assert!(!bucket.try_acquire(refilled));
    }

    #[test]
    fn test_time_going_backwards_adds_nothing() {
        let start = Instant::now() + Duration::from_secs(10);
        let bucket = TokenBucket::new(1, 1, start);

        assert!(bucket.try_acquire(start));
        assert!(!bucket.try_acquire(start - Duration::from_secs(5)));
        assert!(!bucket.try_acquire(start));
    }
}
