//! Request/response logging.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

use super::{CallResult, Middleware, Next};
use crate::context::CallContext;

/// Logs call start at info, then completion at info or failure at error.
///
/// Runs inside the request-id span, so events carry `request_id` without
/// repeating it here.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingStage;

impl LoggingStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for LoggingStage {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, ctx: &mut CallContext, next: Next<'_>) -> CallResult {
        let start = Instant::now();
        let method = ctx.method.clone();

        info!(method = %method, peer = ?ctx.peer, "Request received");

        let result = next.run(ctx).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(_) => {
                info!(
                    method = %method,
                    grpc_status = ?tonic::Code::Ok,
                    status_code = tonic::Code::Ok as i32,
                    duration_ms,
                    "Request completed"
                );
            }
            Err(err) => {
                let code = err.code().grpc_code();
                error!(
                    method = %method,
                    grpc_status = ?code,
                    status_code = code as i32,
                    error_code = err.code().id(),
                    error = %err,
                    duration_ms,
                    "Request failed"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ErrorCode};
    use crate::middleware::Pipeline;

    #[tokio::test]
    async fn test_logging_is_transparent() {
        let pipeline = Pipeline::builder().stage(LoggingStage::new()).build();

        let mut ctx = CallContext::new("/svc/M");
        let ok = pipeline.call(&mut ctx, |_| async { Ok(41 + 1) }).await;
        assert_eq!(ok.unwrap(), 42);

        let mut ctx = CallContext::new("/svc/M");
        let err = pipeline
            .call(&mut ctx, |_| async {
                Err::<(), _>(AppError::new(ErrorCode::Unavailable))
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unavailable);
    }
}
