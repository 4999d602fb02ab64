//! gRPC server implementation.

use std::future::Future;
use std::net::SocketAddr;

use tonic::transport::Server;
use tracing::{error, info};

use super::{HelloServiceImpl, HelloServiceServer, UserServiceImpl, UserServiceServer};
use crate::config::AppConfig;
use crate::error::{Result, ServiceError};
use crate::middleware::Pipeline;
use crate::usecase::{HelloUsecase, UserUsecase};

/// gRPC server hosting the hello and user services.
pub struct GrpcServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Server tuning copied from the application configuration
    config: AppConfig,
    hello: HelloServiceImpl,
    user: UserServiceImpl,
}

impl GrpcServer {
    pub fn new(
        config: &AppConfig,
        pipeline: Pipeline,
        hello: HelloUsecase,
        user: UserUsecase,
    ) -> Self {
        Self {
            addr: config.grpc_addr,
            config: config.clone(),
            hello: HelloServiceImpl::new(pipeline.clone(), hello),
            user: UserServiceImpl::new(pipeline, user),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the gRPC server with graceful shutdown.
    ///
    /// The server stops accepting calls when `signal` resolves and returns
    /// once in-flight calls have drained.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let config = self.config;
        let hello = HelloServiceServer::new(self.hello)
            .max_decoding_message_size(config.grpc_max_recv_msg_size)
            .max_encoding_message_size(config.grpc_max_send_msg_size);
        let user = UserServiceServer::new(self.user)
            .max_decoding_message_size(config.grpc_max_recv_msg_size)
            .max_encoding_message_size(config.grpc_max_send_msg_size);

        info!(
            addr = %self.addr,
            max_concurrent_streams = config.grpc_max_concurrent_streams,
            "Starting gRPC server"
        );

        let mut builder = Server::builder()
            .max_concurrent_streams(config.grpc_max_concurrent_streams)
            .http2_keepalive_interval(Some(config.keepalive_time()))
            .http2_keepalive_timeout(Some(config.keepalive_timeout()));
        if let Some(age) = config.max_connection_age() {
            builder = builder.max_connection_age(age);
        }

        builder
            .add_service(hello)
            .add_service(user)
            .serve_with_shutdown(self.addr, signal)
            .await
            .map_err(|e| {
                error!(error = %e, "gRPC server failed");
                ServiceError::Transport(e)
            })
    }
}
