//! # Observability
//!
//! - `logging`: tracing subscriber setup and structured failure logging
//! - `metrics`: Prometheus metrics collection

pub mod logging;
pub mod metrics;
