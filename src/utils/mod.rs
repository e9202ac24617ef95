//! # Utility Modules
//!
//! Supporting pieces shared across the crate.
//!
//! ## Components
//! - **Blocking**: CPU-bound work on the inbound task without stalling the runtime
//! - **Logging**: tracing subscriber setup from [`crate::config::LoggingConfig`]
//! - **Metrics**: per-connection atomic counters
//! - **Timeout**: async timeout wrapper and default durations

pub mod blocking;
pub mod logging;
pub mod metrics;
pub mod timeout;

pub use metrics::{ConnectionMetrics, MetricsSnapshot};
