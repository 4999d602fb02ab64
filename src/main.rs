use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use protoserve::config::AppConfig;
use protoserve::grpc::GrpcServer;
use protoserve::http::{self, AppState};
use protoserve::middleware::standard_pipeline;
use protoserve::ratelimit::SystemClock;
use protoserve::repository::InMemoryUserRepository;
use protoserve::telemetry::{init_tracing, Metrics};
use protoserve::usecase::{HelloUsecase, UserUsecase};

/// gRPC service with an HTTP/JSON gateway and per-key rate limiting.
#[derive(Parser, Debug)]
#[command(name = "protoserve", version, about)]
struct Args {
    /// Optional configuration file; environment variables override it
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref())?;
    init_tracing(&config.log())?;

    info!("Starting Protoserve");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        grpc_addr = %config.grpc_addr,
        http_addr = %config.http_addr,
        rate_limit_enabled = config.rate_limit_enabled,
        rate_limit_strategy = %config.rate_limit_strategy,
        "Configuration loaded"
    );

    let metrics = Arc::new(Metrics::new()?);
    let pipeline = standard_pipeline(&config, Arc::clone(&metrics), Arc::new(SystemClock::new()));
    info!(stages = ?pipeline.stage_names(), "Middleware pipeline assembled");

    let hello = HelloUsecase::new();
    let users = UserUsecase::new(Arc::new(InMemoryUserRepository::new()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let grpc_server = GrpcServer::new(&config, pipeline.clone(), hello, users.clone());
    let grpc_task = tokio::spawn(grpc_server.serve_with_shutdown(wait_for(shutdown_rx.clone())));

    let router = http::create_router(AppState {
        config: Arc::new(config.clone()),
        pipeline,
        hello,
        users,
        metrics,
    });
    let http_task = tokio::spawn(http::serve_with_shutdown(
        config.http_addr,
        router,
        wait_for(shutdown_rx),
    ));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    let drained = tokio::time::timeout(config.shutdown_timeout(), async {
        let (grpc, http) = tokio::join!(grpc_task, http_task);
        for (name, result) in [("grpc", grpc), ("http", http)] {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(server = name, error = %e, "Server exited with error"),
                Err(e) => error!(server = name, error = %e, "Server task panicked"),
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!(
            timeout_secs = config.shutdown_timeout().as_secs(),
            "Shutdown timeout elapsed with calls still in flight"
        );
    }

    info!("Protoserve stopped");
    Ok(())
}

/// Resolve once the shutdown flag flips.
async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
