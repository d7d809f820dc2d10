//! # AWS Secrets Manager Client
//!
//! Writes the secret string to an existing secret. The secret itself is
//! created and deleted by the surrounding stack, never by this provider.

use crate::error::TransportError;
use crate::observability::metrics;
use crate::provider::SecretManagerProvider;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

/// AWS Secrets Manager provider implementation
pub struct AwsSecretManager {
    client: SecretsManagerClient,
}

impl std::fmt::Debug for AwsSecretManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretManager").finish_non_exhaustive()
    }
}

impl AwsSecretManager {
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: SecretsManagerClient::new(sdk_config),
        }
    }
}

#[async_trait]
impl SecretManagerProvider for AwsSecretManager {
    async fn put_secret_value(
        &self,
        secret_id: &str,
        secret_value: &str,
    ) -> Result<(), TransportError> {
        let span = info_span!("aws.secret.put_value", secret.id = secret_id);
        let start = Instant::now();

        async move {
            match self
                .client
                .put_secret_value()
                .secret_id(secret_id)
                .secret_string(secret_value)
                .send()
                .await
            {
                Ok(output) => {
                    metrics::record_provider_operation("secretsmanager", "put_secret_value");
                    info!(
                        version_id = output.version_id().unwrap_or("unknown"),
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Put secret value"
                    );
                    Ok(())
                }
                Err(e) => {
                    metrics::increment_provider_operation_errors("secretsmanager");
                    Err(TransportError::SecretWrite {
                        secret_id: secret_id.to_string(),
                        message: DisplayErrorContext(&e).to_string(),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}
