//! # Logging
//!
//! Tracing subscriber setup and the structured record written when an
//! invocation fails.
//!
//! Logs always go to stderr; stdout is reserved for the lifecycle response
//! when running as `handle`.

use crate::config::{LogFormat, ProviderConfig};
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::error::Error;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &ProviderConfig) -> Result<()> {
    let level = config.log_level.to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sops_secretsmanager_provider={level},tower_http={level}"
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.log_format {
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => builder.with_ansi(config.log_enable_color).try_init(),
    }
    .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}"))
}

/// Display of `error` followed by each of its sources, outermost first
#[must_use]
pub fn error_chain(error: &(dyn Error + 'static)) -> Vec<String> {
    std::iter::successors(Some(error), |&e| e.source())
        .map(ToString::to_string)
        .collect()
}

/// Log a failure with its name, message, cause chain and the triggering event
pub fn log_error(name: &str, error: &(dyn Error + 'static), message: &str, event: &Value) {
    let stack = error_chain(error);
    tracing::error!(
        error.name = name,
        error.message = %error,
        error.stack = ?stack,
        event = %event,
        "{message}"
    );
}
