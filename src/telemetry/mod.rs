//! Logging and metrics setup.

mod metrics;
mod tracing;

pub use self::metrics::Metrics;
pub use self::tracing::init_tracing;
