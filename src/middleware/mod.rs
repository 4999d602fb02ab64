//! Ordered middleware pipeline wrapped around every RPC handler.
//!
//! A [`Pipeline`] is an immutable list of [`Middleware`] stages. Each stage
//! receives the call context and a [`Next`] handle; calling [`Next::run`]
//! forwards to the remaining stages and finally the handler, while returning
//! without calling it short-circuits the call. Both transports (gRPC and the
//! HTTP gateway) run their handlers through the same pipeline.

mod logging;
mod metrics;
mod ratelimit;
mod request_id;

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::AppConfig;
use crate::context::CallContext;
use crate::error::AppError;
use crate::ratelimit::{Clock, LimiterRegistry};
use crate::telemetry::Metrics;

pub use logging::LoggingStage;
pub use metrics::MetricsStage;
pub use ratelimit::RateLimitStage;
pub use request_id::RequestIdStage;

/// Type-erased handler output.
pub type Reply = Box<dyn Any + Send>;

/// What every stage returns.
pub type CallResult = Result<Reply, AppError>;

type Handler<'a> = Box<dyn FnOnce(CallContext) -> BoxFuture<'a, CallResult> + Send + 'a>;

/// One stage of the pipeline.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Process a call, usually by calling `next.run(ctx)`.
    async fn handle(&self, ctx: &mut CallContext, next: Next<'_>) -> CallResult;
}

/// The remainder of the pipeline after the current stage.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    handler: Handler<'a>,
}

impl<'a> Next<'a> {
    /// Run the remaining stages and then the handler.
    pub fn run<'c>(self, ctx: &'c mut CallContext) -> BoxFuture<'c, CallResult>
    where
        'a: 'c,
    {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    handler: self.handler,
                };
                stage.handle(ctx, next)
            }
            None => (self.handler)(ctx.clone()),
        }
    }
}

/// Immutable ordered list of stages.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn Middleware>]>,
}

impl Default for Pipeline {
    fn default() -> Self {
        PipelineBuilder::new().build()
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Run `handler` through every stage.
    ///
    /// The handler receives a copy of the context as it stands after all
    /// stages ran; stage augmentations remain visible in `ctx` afterwards.
    pub async fn call<T, F, Fut>(&self, ctx: &mut CallContext, handler: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(CallContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let handler: Handler<'_> = Box::new(move |ctx: CallContext| {
            async move { handler(ctx).await.map(|reply| Box::new(reply) as Reply) }.boxed()
        });

        let next = Next {
            stages: &self.stages,
            handler,
        };
        let reply = next.run(ctx).await?;

        reply
            .downcast::<T>()
            .map(|reply| *reply)
            .map_err(|_| AppError::internal("handler returned an unexpected reply type"))
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }
}

/// Builder for [`Pipeline`]; stages run in the order they are added.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Middleware>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<M: Middleware + 'static>(mut self, stage: M) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Add `stage` only when present.
    pub fn optional_stage<M: Middleware + 'static>(self, stage: Option<M>) -> Self {
        match stage {
            Some(stage) => self.stage(stage),
            None => self,
        }
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages.into(),
        }
    }
}

/// Assemble the standard stage order: request id, metrics, rate limiting
/// (only when enabled), logging.
pub fn standard_pipeline(
    config: &AppConfig,
    metrics: Arc<Metrics>,
    clock: Arc<dyn Clock>,
) -> Pipeline {
    let rate_limit = config.rate_limit_enabled.then(|| {
        let registry = Arc::new(LimiterRegistry::with_clock(config.rate_limit(), clock));
        RateLimitStage::new(registry, Arc::clone(&metrics))
    });

    Pipeline::builder()
        .stage(RequestIdStage::new())
        .stage(MetricsStage::new(metrics))
        .optional_stage(rate_limit)
        .stage(LoggingStage::new())
        .build()
}
