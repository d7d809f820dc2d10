//! # Initialization
//!
//! Process start-up shared by `handle` and `serve`: tracing, deferred config
//! warnings, metrics, AWS clients and the sops binary.

use crate::config::ProviderConfig;
use crate::handler::LifecycleHandler;
use crate::observability::{logging, metrics};
use crate::provider::aws::{load_sdk_config, AwsSecretManager, S3ObjectStore};
use crate::sops::SopsDecryptor;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Initialize logging and metrics, then wire the handler to AWS and sops
///
/// # Errors
///
/// Fails when tracing or metrics cannot be installed, or when no sops
/// binary can be found.
pub async fn initialize(config: &ProviderConfig) -> Result<LifecycleHandler> {
    logging::init_tracing(config)?;
    config.log_warnings();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        built_at = env!("BUILD_DATETIME"),
        git_hash = env!("BUILD_GIT_HASH"),
        "Starting SOPS Secrets Manager provider"
    );

    metrics::register_metrics()?;

    let decryptor = SopsDecryptor::locate(config.sops_binary_path.as_deref())
        .context("Failed to locate the sops binary")?;
    info!(binary = %decryptor.binary().display(), "Using sops binary");

    let sdk_config = load_sdk_config(config.aws_region.as_deref()).await;
    info!(region = ?sdk_config.region(), "Loaded AWS configuration");

    Ok(LifecycleHandler::new(
        Arc::new(S3ObjectStore::new(&sdk_config)),
        Arc::new(AwsSecretManager::new(&sdk_config)),
        Arc::new(decryptor),
    )
    .with_failure_policy(config.decrypt_failure_policy))
}
