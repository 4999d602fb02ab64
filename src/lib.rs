//! Protoserve - gRPC service scaffold with an HTTP/JSON gateway
//!
//! Every call, whichever transport it arrives on, runs through one ordered
//! middleware pipeline: request id, metrics, per-key token-bucket rate
//! limiting and logging. Callers over their budget are rejected immediately
//! with `RESOURCE_EXHAUSTED` (HTTP 429) before any handler runs.

pub mod config;
pub mod context;
pub mod error;
pub mod grpc;
pub mod http;
pub mod middleware;
pub mod ratelimit;
pub mod repository;
pub mod telemetry;
pub mod usecase;
