//! Shared fakes for handler and server tests
//!
//! Each fake records the calls it receives so tests can assert on what the
//! handler sent to S3, sops and Secrets Manager.

#![allow(dead_code, reason = "Not every test binary uses every fake")]

use async_trait::async_trait;
use serde_json::{json, Value};
use sops_secretsmanager_provider::error::TransportError;
use sops_secretsmanager_provider::provider::{ObjectStoreProvider, SecretManagerProvider};
use sops_secretsmanager_provider::sops::error::SopsDecryptionError;
use sops_secretsmanager_provider::sops::Decryptor;
use sops_secretsmanager_provider::LifecycleHandler;
use std::sync::{Arc, Mutex};

pub const SECRET_ARN: &str = "mysecretarn";

#[derive(Debug, Default)]
pub struct RecordingObjectStore {
    pub body: Vec<u8>,
    pub fail: bool,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl RecordingObjectStore {
    pub fn with_body(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStoreProvider for RecordingObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        if self.fail {
            return Err(TransportError::ObjectFetch {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "NoSuchKey".to_string(),
            });
        }
        Ok(self.body.clone())
    }
}

#[derive(Debug, Default)]
pub struct RecordingSecretStore {
    pub fail: bool,
    pub writes: Mutex<Vec<(String, String)>>,
}

impl RecordingSecretStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretManagerProvider for RecordingSecretStore {
    async fn put_secret_value(
        &self,
        secret_id: &str,
        secret_value: &str,
    ) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::SecretWrite {
                secret_id: secret_id.to_string(),
                message: "AccessDeniedException".to_string(),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((secret_id.to_string(), secret_value.to_string()));
        Ok(())
    }
}

/// Recorded arguments of one decryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptCall {
    pub content: String,
    pub input_type: String,
    pub kms_key_arn: Option<String>,
}

#[derive(Debug)]
pub struct StaticDecryptor {
    pub result: Result<Value, SopsDecryptionError>,
    pub calls: Mutex<Vec<DecryptCall>>,
}

impl StaticDecryptor {
    pub fn returning(value: Value) -> Self {
        Self {
            result: Ok(value),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: SopsDecryptionError) -> Self {
        Self {
            result: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<DecryptCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Decryptor for StaticDecryptor {
    async fn decrypt(
        &self,
        content: &str,
        input_type: &str,
        kms_key_arn: Option<&str>,
    ) -> Result<Value, SopsDecryptionError> {
        self.calls.lock().unwrap().push(DecryptCall {
            content: content.to_string(),
            input_type: input_type.to_string(),
            kms_key_arn: kms_key_arn.map(ToString::to_string),
        });
        self.result.clone()
    }
}

/// Handler wired to the given fakes, which stay observable through the Arcs
pub struct Harness {
    pub objects: Arc<RecordingObjectStore>,
    pub secrets: Arc<RecordingSecretStore>,
    pub decryptor: Arc<StaticDecryptor>,
    pub handler: LifecycleHandler,
}

impl Harness {
    pub fn new(
        objects: RecordingObjectStore,
        secrets: RecordingSecretStore,
        decryptor: StaticDecryptor,
    ) -> Self {
        let objects = Arc::new(objects);
        let secrets = Arc::new(secrets);
        let decryptor = Arc::new(decryptor);
        let handler = LifecycleHandler::new(
            Arc::clone(&objects) as Arc<dyn ObjectStoreProvider>,
            Arc::clone(&secrets) as Arc<dyn SecretManagerProvider>,
            Arc::clone(&decryptor) as Arc<dyn Decryptor>,
        );
        Self {
            objects,
            secrets,
            decryptor,
            handler,
        }
    }

    /// Fake S3 content `encrypted`, decrypting to `decrypted`, secret writes succeed
    pub fn decrypting_to(decrypted: Value) -> Self {
        Self::new(
            RecordingObjectStore::with_body("encrypted"),
            RecordingSecretStore::default(),
            StaticDecryptor::returning(decrypted),
        )
    }
}

/// Resource properties with no output mode configured
pub fn base_properties() -> Value {
    json!({
        "S3Bucket": "mybucket",
        "S3Path": "mykey.yaml",
        "Mappings": "{}",
        "SingleValueMapping": "null",
        "WholeFile": "false",
        "SecretArn": SECRET_ARN,
        "SourceHash": "123",
    })
}

/// Merge `overrides` into [`base_properties`]
pub fn properties_with(overrides: Value) -> Value {
    let mut properties = base_properties();
    if let (Some(base), Some(extra)) = (properties.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    properties
}

pub fn create_event(properties: Value) -> Value {
    json!({
        "RequestType": "Create",
        "ResourceProperties": properties,
    })
}
