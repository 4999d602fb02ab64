//! Request count, latency and in-flight metrics.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use prometheus::IntGauge;

use super::{CallResult, Middleware, Next};
use crate::context::CallContext;
use crate::telemetry::Metrics;

/// Records every call that reaches it, including calls rejected by later
/// stages, labelled with the method and the numeric gRPC status code.
#[derive(Clone)]
pub struct MetricsStage {
    metrics: Arc<Metrics>,
}

impl MetricsStage {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

/// Decrements the in-flight gauge even if the call future is dropped.
struct InFlight<'a>(&'a IntGauge);

impl<'a> InFlight<'a> {
    fn enter(gauge: &'a IntGauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.dec();
    }
}

#[async_trait]
impl Middleware for MetricsStage {
    fn name(&self) -> &'static str {
        "metrics"
    }

    async fn handle(&self, ctx: &mut CallContext, next: Next<'_>) -> CallResult {
        let start = Instant::now();
        let method = ctx.method.clone();

        let result = {
            let _in_flight = InFlight::enter(&self.metrics.active_requests);
            next.run(ctx).await
        };

        let code = match &result {
            Ok(_) => tonic::Code::Ok,
            Err(err) => err.code().grpc_code(),
        };
        self.metrics.record_request(&method, code, start.elapsed());

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ErrorCode};
    use crate::middleware::Pipeline;

    #[tokio::test]
    async fn test_counts_success_and_failure() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let pipeline = Pipeline::builder()
            .stage(MetricsStage::new(Arc::clone(&metrics)))
            .build();

        let mut ctx = CallContext::new("/svc/Ok");
        pipeline.call(&mut ctx, |_| async { Ok(()) }).await.unwrap();

        let mut ctx = CallContext::new("/svc/Fail");
        let _ = pipeline
            .call(&mut ctx, |_| async {
                Err::<(), _>(AppError::new(ErrorCode::UserNotFound))
            })
            .await;

        assert_eq!(metrics.requests("/svc/Ok", tonic::Code::Ok), 1);
        assert_eq!(metrics.requests("/svc/Fail", tonic::Code::NotFound), 1);
        assert_eq!(metrics.active_requests.get(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_gauge_during_call() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let pipeline = Pipeline::builder()
            .stage(MetricsStage::new(Arc::clone(&metrics)))
            .build();

        let observer = Arc::clone(&metrics);
        let mut ctx = CallContext::new("/svc/M");
        let during = pipeline
            .call(&mut ctx, move |_| async move { Ok(observer.active_requests.get()) })
            .await
            .unwrap();

        assert_eq!(during, 1);
        assert_eq!(metrics.active_requests.get(), 0);
    }
}
