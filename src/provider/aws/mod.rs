//! # AWS Providers
//!
//! S3 object fetch and Secrets Manager writes using the official AWS SDK.
//!
//! Credentials come from the default provider chain: the function's
//! execution role when running as a custom resource handler, or the usual
//! environment/profile sources when run locally.

pub mod s3;
pub mod secrets_manager;

pub use s3::S3ObjectStore;
pub use secrets_manager::AwsSecretManager;

use aws_config::SdkConfig;
use tracing::info;

/// Load the shared SDK configuration
///
/// `region` overrides the region discovered by the default chain.
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        info!(region, "Using configured AWS region");
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    loader.load().await
}
