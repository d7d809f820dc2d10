//! # S3 Object Store
//!
//! Fetches the encrypted file from S3.

use crate::error::TransportError;
use crate::observability::metrics;
use crate::provider::ObjectStoreProvider;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};

/// S3 provider implementation
pub struct S3ObjectStore {
    client: S3Client,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore").finish_non_exhaustive()
    }
}

impl S3ObjectStore {
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: S3Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStoreProvider for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, TransportError> {
        let span = info_span!("aws.s3.get_object", s3.bucket = bucket, s3.key = key);
        let start = Instant::now();

        async move {
            let output = match self.client.get_object().bucket(bucket).key(key).send().await {
                Ok(output) => output,
                Err(e) => {
                    metrics::increment_provider_operation_errors("s3");
                    return Err(TransportError::ObjectFetch {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        message: DisplayErrorContext(&e).to_string(),
                    });
                }
            };

            let body = output.body.collect().await.map_err(|e| {
                metrics::increment_provider_operation_errors("s3");
                TransportError::ObjectBody {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;
            let bytes = body.into_bytes().to_vec();

            metrics::record_provider_operation("s3", "get_object");
            debug!(
                size = bytes.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Fetched object from S3"
            );
            Ok(bytes)
        }
        .instrument(span)
        .await
    }
}
