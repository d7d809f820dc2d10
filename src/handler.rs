//! # Lifecycle Handler
//!
//! Orchestrates fetch, decrypt, extract and persist for one lifecycle event.
//!
//! ## Flow
//!
//! - **Create**: fetch the object, decode it as UTF-8, pick the sops input
//!   type, decrypt, shape the secret string for the active output mode and
//!   write it to the secret. Returns `secretdata_<SecretArn>`.
//! - **Update**: the full Create flow, keeping the existing PhysicalResourceId.
//! - **Delete**: no I/O; the secret belongs to the surrounding stack.
//!
//! [`LifecycleHandler::on_event`] (and [`LifecycleHandler::on_payload`] for
//! serialized events) is the single failure boundary: every error is logged
//! with full context and surfaces as the opaque [`HandlerFailure`].

use crate::constants::PHYSICAL_RESOURCE_ID_PREFIX;
use crate::error::{HandlerFailure, ProviderError, ValidationError};
use crate::event::{LifecycleEvent, Response};
use crate::mapping::{resolve_mapping, resolve_mappings};
use crate::observability::{logging, metrics};
use crate::properties::{OutputMode, ResourceProperties};
use crate::provider::{ObjectStoreProvider, SecretManagerProvider};
use crate::sops::{DecryptFailurePolicy, Decryptor};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use zeroize::Zeroizing;

/// Custom resource event handler
#[derive(Clone)]
pub struct LifecycleHandler {
    objects: Arc<dyn ObjectStoreProvider>,
    secrets: Arc<dyn SecretManagerProvider>,
    decryptor: Arc<dyn Decryptor>,
    failure_policy: DecryptFailurePolicy,
}

impl std::fmt::Debug for LifecycleHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHandler")
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}

impl LifecycleHandler {
    pub fn new(
        objects: Arc<dyn ObjectStoreProvider>,
        secrets: Arc<dyn SecretManagerProvider>,
        decryptor: Arc<dyn Decryptor>,
    ) -> Self {
        Self {
            objects,
            secrets,
            decryptor,
            failure_policy: DecryptFailurePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: DecryptFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Handle an untyped lifecycle event
    ///
    /// # Errors
    ///
    /// Returns [`HandlerFailure`] for any failure. The cause is only logged.
    pub async fn on_event(&self, event: &Value) -> Result<Response, HandlerFailure> {
        info!(event = %event, "Handling event");
        let start = Instant::now();

        let result = match LifecycleEvent::from_value(event) {
            Ok(decoded) => {
                metrics::increment_invocations(decoded.request_type());
                self.handle(decoded).await
            }
            Err(e) => {
                metrics::increment_invocations("Invalid");
                Err(e.into())
            }
        };
        metrics::observe_invocation_duration(start.elapsed().as_secs_f64());

        result.map_err(|e| fail(&e, event))
    }

    /// Handle a lifecycle event still in its serialized form
    ///
    /// A payload that is not JSON fails through the same boundary as any
    /// other invalid event.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerFailure`] for any failure. The cause is only logged.
    pub async fn on_payload(&self, payload: &[u8]) -> Result<Response, HandlerFailure> {
        match serde_json::from_slice::<Value>(payload) {
            Ok(event) => self.on_event(&event).await,
            Err(source) => {
                metrics::increment_invocations("Invalid");
                let raw = Value::String(String::from_utf8_lossy(payload).into_owned());
                let error = ProviderError::from(ValidationError::MalformedEvent(source));
                Err(fail(&error, &raw))
            }
        }
    }

    /// Dispatch a decoded event
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ProviderError`] of whichever step failed.
    pub async fn handle(&self, event: LifecycleEvent) -> Result<Response, ProviderError> {
        let span = info_span!("lifecycle", request_type = event.request_type());
        async move {
            match event {
                LifecycleEvent::Create { properties } => self.handle_create(&properties).await,
                LifecycleEvent::Update {
                    physical_resource_id,
                    properties,
                } => {
                    let response = self.handle_create(&properties).await?;
                    Ok(Response {
                        physical_resource_id,
                        ..response
                    })
                }
                LifecycleEvent::Delete {
                    physical_resource_id,
                } => Ok(Response::new(physical_resource_id)),
            }
        }
        .instrument(span)
        .await
    }

    async fn handle_create(
        &self,
        properties: &ResourceProperties,
    ) -> Result<Response, ProviderError> {
        let bucket = properties.s3_bucket.as_str();
        let key = properties.s3_path.as_str();

        info!(bucket, key, "Getting object from S3");
        let body = self.objects.get_object(bucket, key).await?;

        info!(size = body.len(), "Reading file");
        let content = Zeroizing::new(String::from_utf8(body).map_err(|source| {
            ProviderError::Decode {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            }
        })?);

        info!(
            s3_path = key,
            file_type = ?properties.file_type,
            whole_file = properties.whole_file,
            "Determining file type"
        );
        let input_type = properties.input_type();

        info!(
            input_type,
            kms_key_arn = ?properties.kms_key_arn,
            size = content.len(),
            "Decoding with sops"
        );
        let data = self.decrypt(&content, input_type, properties).await?;
        info!("Successfully decoded secret data with sops");

        let secret_arn = properties.secret_arn.as_str();
        let secret_string = Zeroizing::new(render_secret_string(&data, properties)?);

        self.secrets
            .put_secret_value(secret_arn, &secret_string)
            .await?;
        info!(secret_arn, "Wrote data to secretsmanager");

        Ok(Response::new(format!(
            "{PHYSICAL_RESOURCE_ID_PREFIX}{secret_arn}"
        )))
    }

    async fn decrypt(
        &self,
        content: &str,
        input_type: &str,
        properties: &ResourceProperties,
    ) -> Result<Value, ProviderError> {
        match self
            .decryptor
            .decrypt(content, input_type, properties.kms_key_arn.as_deref())
            .await
        {
            Ok(data) => Ok(data),
            Err(e) if e.exited_with_failure && self.failure_policy == DecryptFailurePolicy::Empty => {
                warn!(
                    reason = e.reason.as_str(),
                    policy = self.failure_policy.as_str(),
                    "sops failed, continuing with an empty document: {e}"
                );
                Ok(Value::Object(Map::new()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Log and count a failed invocation, keeping only the opaque signal
fn fail(error: &ProviderError, event: &Value) -> HandlerFailure {
    metrics::increment_invocation_failures(error.kind());
    logging::log_error(error.kind(), error, "Unhandled error, failing", event);
    HandlerFailure
}

/// Shape the decrypted document into the string stored in the secret
fn render_secret_string(
    data: &Value,
    properties: &ResourceProperties,
) -> Result<String, ProviderError> {
    let secret_arn = properties.secret_arn.as_str();
    match properties.output_mode() {
        OutputMode::WholeFile => {
            info!(secret_arn, "Writing decoded data to secretsmanager as whole file");
            Ok(match data.get("data") {
                Some(Value::String(s)) => s.clone(),
                Some(value) if !is_falsy(value) => value.to_string(),
                _ => String::new(),
            })
        }
        OutputMode::SingleValue(mapping) => {
            info!(
                secret_arn,
                path = ?mapping.path,
                encoding = %mapping.encoding,
                "Writing decoded data to secretsmanager as single value"
            );
            let value = resolve_mapping(data, mapping);
            if value.is_none() {
                warn!(path = ?mapping.path, "Single value mapping did not resolve, writing empty string");
            }
            Ok(value.unwrap_or_default())
        }
        OutputMode::Mappings(mappings) => {
            info!(
                keys = ?mappings.keys().collect::<Vec<_>>(),
                "Mapping values from decoded data"
            );
            let mapped = resolve_mappings(data, mappings);
            info!(
                secret_arn,
                resolved = mapped.len(),
                "Writing decoded data to secretsmanager as JSON file"
            );
            serde_json::to_string(&mapped).map_err(ProviderError::Output)
        }
    }
}

/// `null`, `false`, zero and the empty string carry no whole-file content
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(true) | Value::Array(_) | Value::Object(_) => false,
    }
}
