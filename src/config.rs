//! Configuration management for Protoserve.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional file, then environment variables. Environment keys are the
//! upper-case field names, e.g. `RATE_LIMIT_REQUESTS_PER_SEC=50`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Result;
use crate::ratelimit::{KeyStrategy, RateLimitConfig};

/// Main configuration for the Protoserve service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service name reported by the health endpoint
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Service version reported by the health endpoint
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// gRPC server address
    #[serde(default = "default_grpc_addr")]
    pub grpc_addr: SocketAddr,

    /// HTTP gateway address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// Log level directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Whether the rate limiting stage is installed at all
    #[serde(default = "default_true")]
    pub rate_limit_enabled: bool,

    /// Token refill rate; non-positive values fall back to 100
    #[serde(default = "default_requests_per_sec")]
    pub rate_limit_requests_per_sec: i64,

    /// Bucket size; non-positive values fall back to twice the rate
    #[serde(default = "default_burst_size")]
    pub rate_limit_burst_size: i64,

    #[serde(default)]
    pub rate_limit_strategy: KeyStrategy,

    #[serde(default = "default_max_concurrent_streams")]
    pub grpc_max_concurrent_streams: u32,

    #[serde(default = "default_keepalive_time")]
    pub grpc_keepalive_time_secs: u64,

    #[serde(default = "default_keepalive_timeout")]
    pub grpc_keepalive_timeout_secs: u64,

    /// Connections older than this are closed gracefully; 0 disables the limit
    #[serde(default = "default_max_connection_age")]
    pub grpc_max_connection_age_secs: u64,

    #[serde(default = "default_msg_size")]
    pub grpc_max_recv_msg_size: usize,

    #[serde(default = "default_msg_size")]
    pub grpc_max_send_msg_size: usize,

    /// How long to wait for in-flight calls after a shutdown signal
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Logging settings handed to [`crate::telemetry::init_tracing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            app_version: default_app_version(),
            grpc_addr: default_grpc_addr(),
            http_addr: default_http_addr(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            rate_limit_enabled: true,
            rate_limit_requests_per_sec: default_requests_per_sec(),
            rate_limit_burst_size: default_burst_size(),
            rate_limit_strategy: KeyStrategy::default(),
            grpc_max_concurrent_streams: default_max_concurrent_streams(),
            grpc_keepalive_time_secs: default_keepalive_time(),
            grpc_keepalive_timeout_secs: default_keepalive_timeout(),
            grpc_max_connection_age_secs: default_max_connection_age(),
            grpc_max_recv_msg_size: default_msg_size(),
            grpc_max_send_msg_size: default_msg_size(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

fn default_app_name() -> String {
    "protoserve".to_string()
}

fn default_app_version() -> String {
    "v1.0.0".to_string()
}

fn default_grpc_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 50051))
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_requests_per_sec() -> i64 {
    100
}

fn default_burst_size() -> i64 {
    200
}

fn default_max_concurrent_streams() -> u32 {
    1000
}

fn default_keepalive_time() -> u64 {
    5
}

fn default_keepalive_timeout() -> u64 {
    1
}

fn default_max_connection_age() -> u64 {
    30
}

fn default_msg_size() -> usize {
    4 * 1024 * 1024
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from an optional file plus the process environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_from(path, config::Environment::default().try_parsing(true))
    }

    /// Load configuration from an optional file plus the given environment source.
    pub fn load_from(path: Option<&str>, environment: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let config: AppConfig = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Rate limiting snapshot with defaults applied.
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::with_strategy(
            self.rate_limit_requests_per_sec,
            self.rate_limit_burst_size,
            self.rate_limit_strategy,
        )
    }

    pub fn log(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            format: self.log_format,
        }
    }

    pub fn keepalive_time(&self) -> Duration {
        Duration::from_secs(self.grpc_keepalive_time_secs)
    }

    pub fn keepalive_timeout(&self) -> Duration {
        Duration::from_secs(self.grpc_keepalive_timeout_secs)
    }

    pub fn max_connection_age(&self) -> Option<Duration> {
        (self.grpc_max_connection_age_secs > 0)
            .then(|| Duration::from_secs(self.grpc_max_connection_age_secs))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default()
            .source(Some(source))
            .try_parsing(true)
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::load_from(None, env(&[])).unwrap();

        assert_eq!(config.app_name, "protoserve");
        assert_eq!(config.grpc_addr.port(), 50051);
        assert_eq!(config.http_addr.port(), 8080);
        assert!(config.rate_limit_enabled);
        assert_eq!(config.rate_limit_requests_per_sec, 100);
        assert_eq!(config.rate_limit_burst_size, 200);
        assert_eq!(config.rate_limit_strategy, KeyStrategy::Global);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::load_from(
            None,
            env(&[
                ("RATE_LIMIT_ENABLED", "false"),
                ("RATE_LIMIT_REQUESTS_PER_SEC", "5"),
                ("RATE_LIMIT_BURST_SIZE", "10"),
                ("RATE_LIMIT_STRATEGY", "per-method"),
                ("GRPC_ADDR", "127.0.0.1:6000"),
                ("LOG_FORMAT", "pretty"),
            ]),
        )
        .unwrap();

        assert!(!config.rate_limit_enabled);
        assert_eq!(config.rate_limit_requests_per_sec, 5);
        assert_eq!(config.rate_limit_burst_size, 10);
        assert_eq!(config.rate_limit_strategy, KeyStrategy::PerMethod);
        assert_eq!(config.grpc_addr, "127.0.0.1:6000".parse().unwrap());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_max_connection_age() {
        let config = AppConfig::load_from(None, env(&[])).unwrap();
        assert_eq!(config.max_connection_age(), Some(Duration::from_secs(30)));

        let config =
            AppConfig::load_from(None, env(&[("GRPC_MAX_CONNECTION_AGE_SECS", "0")])).unwrap();
        assert_eq!(config.max_connection_age(), None);
    }

    #[test]
    fn test_strategy_parsing_ignores_case() {
        let config =
            AppConfig::load_from(None, env(&[("RATE_LIMIT_STRATEGY", "Per-Peer")])).unwrap();
        assert_eq!(config.rate_limit_strategy, KeyStrategy::PerPeer);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let result = AppConfig::load_from(None, env(&[("RATE_LIMIT_STRATEGY", "per-user")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_rate_limit_snapshot_applies_defaults() {
        let config = AppConfig {
            rate_limit_requests_per_sec: 0,
            rate_limit_burst_size: 0,
            ..AppConfig::default()
        };

        let rate_limit = config.rate_limit();
        assert_eq!(rate_limit.requests_per_second(), 100);
        assert_eq!(rate_limit.burst_size(), 200);
    }
}
