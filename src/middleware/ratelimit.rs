//! Admission control stage.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{CallResult, Middleware, Next};
use crate::context::CallContext;
use crate::error::AppError;
use crate::ratelimit::LimiterRegistry;
use crate::telemetry::Metrics;

/// Rejects calls whose key has no token available.
///
/// Each call is classified by the registry's key extractor and either
/// forwarded unchanged or failed with a resource-exhausted [`AppError`]. The
/// decision never waits: an empty bucket is an immediate rejection.
#[derive(Clone)]
pub struct RateLimitStage {
    registry: Arc<LimiterRegistry>,
    metrics: Arc<Metrics>,
}

impl RateLimitStage {
    pub fn new(registry: Arc<LimiterRegistry>, metrics: Arc<Metrics>) -> Self {
        Self { registry, metrics }
    }

    pub fn registry(&self) -> &Arc<LimiterRegistry> {
        &self.registry
    }
}

#[async_trait]
impl Middleware for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn handle(&self, ctx: &mut CallContext, next: Next<'_>) -> CallResult {
        let config = self.registry.config();
        let key = config.extractor().extract(ctx);

        if !self.registry.try_acquire(&key) {
            warn!(
                method = %ctx.method,
                rate_limit_key = %key,
                requests_per_second = config.requests_per_second(),
                burst_size = config.burst_size(),
                "Rate limit exceeded"
            );
            self.metrics.record_rate_limit_exceeded(&ctx.method, &key);

            return Err(AppError::rate_limited(config.requests_per_second()));
        }

        next.run(ctx).await
    }
}
