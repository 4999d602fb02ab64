//! Request identifier propagation.

use async_trait::async_trait;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{CallResult, Middleware, Next};
use crate::context::CallContext;

/// Reuses the caller's `x-request-id` or generates a UUIDv4, stores it on
/// the context and runs the rest of the chain inside a span carrying it, so
/// every event logged downstream is tagged with the request id.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdStage;

impl RequestIdStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for RequestIdStage {
    fn name(&self) -> &'static str {
        "request_id"
    }

    async fn handle(&self, ctx: &mut CallContext, next: Next<'_>) -> CallResult {
        let request_id = ctx
            .request_id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();

        let span = info_span!("request", request_id = %request_id, method = %ctx.method);
        next.run(ctx).instrument(span).await
    }
}
