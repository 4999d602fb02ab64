//! Per-key token bucket rate limiting.

mod bucket;
mod clock;
mod key;
mod registry;

pub use bucket::TokenBucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{KeyExtractor, KeyStrategy, GLOBAL_KEY, UNKNOWN_PEER_KEY};
pub use registry::{
    LimiterRegistry, RateLimitConfig, DEFAULT_BURST_MULTIPLIER, DEFAULT_REQUESTS_PER_SECOND,
};
