//! HTTP/JSON gateway.
//!
//! Exposes health and Prometheus endpoints plus JSON routes mirroring the
//! gRPC services. Gateway calls go through the same pipeline instance as the
//! gRPC server and use the gRPC method names, so both transports share one
//! set of rate-limit budgets.

mod handlers;
pub mod models;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::config::AppConfig;
use crate::error::Result;
use crate::middleware::Pipeline;
use crate::telemetry::Metrics;
use crate::usecase::{HelloUsecase, UserUsecase};

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Pipeline,
    pub hello: HelloUsecase,
    pub users: UserUsecase,
    pub metrics: Arc<Metrics>,
}

/// Build the gateway router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/v1/hello/{name}", get(handlers::get_hello))
        .route(
            "/v1/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/v1/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .with_state(state)
}

/// Serve `router` on `addr` until `signal` resolves.
pub async fn serve_with_shutdown<F>(addr: SocketAddr, router: Router, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Starting HTTP gateway");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(signal)
    .await?;
    Ok(())
}
