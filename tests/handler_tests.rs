//! # Lifecycle Handler Tests
//!
//! Drive [`LifecycleHandler::on_event`] with recording fakes for S3, sops and
//! Secrets Manager.
//!
//! These tests verify:
//! - The secret string produced by each output mode
//! - The sops input type and KMS key passed through
//! - PhysicalResourceId derivation on Create, Update and Delete
//! - That every failure surfaces as the opaque `Failed`

mod common;

use common::{
    base_properties, create_event, properties_with, Harness, RecordingObjectStore,
    RecordingSecretStore, StaticDecryptor, SECRET_ARN,
};
use serde_json::json;
use sops_secretsmanager_provider::sops::error::{
    SopsDecryptionError, SopsDecryptionFailureReason,
};
use sops_secretsmanager_provider::sops::DecryptFailurePolicy;
use sops_secretsmanager_provider::{HandlerFailure, Response};

#[tokio::test]
async fn test_create_with_mappings() {
    let harness = Harness::decrypting_to(json!({"a": "abc"}));
    let properties = properties_with(json!({
        "Mappings": r#"{"key":{"path":["a"],"encoding":"string"}}"#,
    }));

    let response = harness
        .handler
        .on_event(&create_event(properties))
        .await
        .unwrap();

    assert_eq!(response, Response::new("secretdata_mysecretarn"));
    assert_eq!(
        harness.objects.calls(),
        vec![("mybucket".to_string(), "mykey.yaml".to_string())]
    );

    let decrypts = harness.decryptor.calls();
    assert_eq!(decrypts.len(), 1);
    assert_eq!(decrypts[0].content, "encrypted");
    assert_eq!(decrypts[0].input_type, "yaml");
    assert_eq!(decrypts[0].kms_key_arn, None);

    assert_eq!(
        harness.secrets.writes(),
        vec![(SECRET_ARN.to_string(), r#"{"key":"abc"}"#.to_string())]
    );
}

#[tokio::test]
async fn test_create_mapping_encodings_and_missing_paths() {
    let harness = Harness::decrypting_to(json!({
        "a": 1234,
        "b": {"c": "d"},
        "nested": {"deep": "value"},
    }));
    let properties = properties_with(json!({
        "Mappings": json!({
            "num": {"path": ["a"]},
            "obj": {"path": ["b"], "encoding": "json"},
            "deep": {"path": ["nested", "deep"], "encoding": "string"},
            "missing": {"path": ["nope", "never"]},
        })
        .to_string(),
    }));

    harness
        .handler
        .on_event(&create_event(properties))
        .await
        .unwrap();

    let writes = harness.secrets.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(
        writes[0].1,
        r#"{"deep":"value","num":"1234","obj":"{\"c\":\"d\"}"}"#
    );
}

#[tokio::test]
async fn test_create_with_no_mappings_writes_empty_object() {
    let harness = Harness::decrypting_to(json!({"a": "abc"}));

    harness
        .handler
        .on_event(&create_event(base_properties()))
        .await
        .unwrap();

    assert_eq!(
        harness.secrets.writes(),
        vec![(SECRET_ARN.to_string(), "{}".to_string())]
    );
}

#[tokio::test]
async fn test_create_whole_file() {
    let harness = Harness::decrypting_to(json!({"data": "line one\nline two"}));
    let properties = properties_with(json!({
        "S3Path": "certificate.pem",
        "WholeFile": "true",
        // Ignored while WholeFile is set
        "Mappings": r#"{"key":{"path":["a"]}}"#,
    }));

    let response = harness
        .handler
        .on_event(&create_event(properties))
        .await
        .unwrap();

    assert_eq!(response.physical_resource_id, "secretdata_mysecretarn");
    assert_eq!(harness.decryptor.calls()[0].input_type, "json");
    assert_eq!(
        harness.secrets.writes(),
        vec![(SECRET_ARN.to_string(), "line one\nline two".to_string())]
    );
}

#[tokio::test]
async fn test_create_whole_file_without_data_writes_empty_string() {
    let harness = Harness::decrypting_to(json!({"other": 1}));
    let properties = properties_with(json!({"WholeFile": true}));

    harness
        .handler
        .on_event(&create_event(properties))
        .await
        .unwrap();

    assert_eq!(
        harness.secrets.writes(),
        vec![(SECRET_ARN.to_string(), String::new())]
    );
}

#[tokio::test]
async fn test_create_single_value() {
    let harness = Harness::decrypting_to(json!({"db": {"password": "hunter2"}}));
    let properties = properties_with(json!({
        "SingleValueMapping": r#"{"path":["db","password"],"encoding":"string"}"#,
        "Mappings": r#"{"ignored":{"path":["db"]}}"#,
    }));

    harness
        .handler
        .on_event(&create_event(properties))
        .await
        .unwrap();

    assert_eq!(
        harness.secrets.writes(),
        vec![(SECRET_ARN.to_string(), "hunter2".to_string())]
    );
}

#[tokio::test]
async fn test_create_single_value_json_encoding() {
    let harness = Harness::decrypting_to(json!({"db": {"user": "u", "port": 5432}}));
    let properties = properties_with(json!({
        "SingleValueMapping": r#"{"path":["db"],"encoding":"json"}"#,
    }));

    harness
        .handler
        .on_event(&create_event(properties))
        .await
        .unwrap();

    assert_eq!(harness.secrets.writes()[0].1, r#"{"user":"u","port":5432}"#);
}

#[tokio::test]
async fn test_explicit_file_type_overrides_extension() {
    let harness = Harness::decrypting_to(json!({}));
    let properties = properties_with(json!({
        "S3Path": "secrets.txt",
        "FileType": "dotenv",
    }));

    harness
        .handler
        .on_event(&create_event(properties))
        .await
        .unwrap();

    assert_eq!(harness.decryptor.calls()[0].input_type, "dotenv");
}

#[tokio::test]
async fn test_kms_key_is_passed_to_sops() {
    let harness = Harness::decrypting_to(json!({}));
    let arn = "arn:aws:kms:eu-west-1:123456789012:key/1234";
    let properties = properties_with(json!({"KMSKeyArn": arn}));

    harness
        .handler
        .on_event(&create_event(properties))
        .await
        .unwrap();

    assert_eq!(
        harness.decryptor.calls()[0].kms_key_arn.as_deref(),
        Some(arn)
    );
}

#[tokio::test]
async fn test_update_keeps_physical_resource_id() {
    let harness = Harness::decrypting_to(json!({"a": "new"}));
    let event = json!({
        "RequestType": "Update",
        "PhysicalResourceId": "secretdata_original",
        "ResourceProperties": properties_with(json!({
            "Mappings": r#"{"key":{"path":["a"]}}"#,
        })),
    });

    let response = harness.handler.on_event(&event).await.unwrap();

    assert_eq!(response, Response::new("secretdata_original"));
    assert_eq!(
        harness.secrets.writes(),
        vec![(SECRET_ARN.to_string(), r#"{"key":"new"}"#.to_string())]
    );
}

#[tokio::test]
async fn test_delete_performs_no_io() {
    let harness = Harness::decrypting_to(json!({}));
    let event = json!({
        "RequestType": "Delete",
        "PhysicalResourceId": "abc123",
        "ResourceProperties": base_properties(),
    });

    let response = harness.handler.on_event(&event).await.unwrap();

    assert_eq!(response, Response::new("abc123"));
    assert!(harness.objects.calls().is_empty());
    assert!(harness.decryptor.calls().is_empty());
    assert!(harness.secrets.writes().is_empty());
}

#[tokio::test]
async fn test_malformed_mappings_fail_before_io() {
    let harness = Harness::decrypting_to(json!({}));
    let properties = properties_with(json!({"Mappings": "{not json"}));

    let err = harness
        .handler
        .on_event(&create_event(properties))
        .await
        .unwrap_err();

    assert_eq!(err, HandlerFailure);
    assert_eq!(err.to_string(), "Failed");
    assert!(harness.objects.calls().is_empty());
    assert!(harness.secrets.writes().is_empty());
}

#[tokio::test]
async fn test_missing_required_property_fails() {
    let harness = Harness::decrypting_to(json!({}));
    let mut properties = base_properties();
    properties.as_object_mut().unwrap().remove("SecretArn");

    let result = harness.handler.on_event(&create_event(properties)).await;

    assert_eq!(result, Err(HandlerFailure));
    assert!(harness.objects.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_request_type_fails() {
    let harness = Harness::decrypting_to(json!({}));
    let event = json!({
        "RequestType": "Replace",
        "PhysicalResourceId": "abc123",
        "ResourceProperties": base_properties(),
    });

    assert_eq!(harness.handler.on_event(&event).await, Err(HandlerFailure));
    assert!(harness.objects.calls().is_empty());
}

#[tokio::test]
async fn test_object_fetch_failure_fails() {
    let harness = Harness::new(
        RecordingObjectStore::failing(),
        RecordingSecretStore::default(),
        StaticDecryptor::returning(json!({})),
    );

    let result = harness
        .handler
        .on_event(&create_event(base_properties()))
        .await;

    assert_eq!(result, Err(HandlerFailure));
    assert!(harness.decryptor.calls().is_empty());
    assert!(harness.secrets.writes().is_empty());
}

#[tokio::test]
async fn test_invalid_utf8_object_fails() {
    let harness = Harness::new(
        RecordingObjectStore::with_body(vec![0xff, 0xfe, 0xfd]),
        RecordingSecretStore::default(),
        StaticDecryptor::returning(json!({})),
    );

    let result = harness
        .handler
        .on_event(&create_event(base_properties()))
        .await;

    assert_eq!(result, Err(HandlerFailure));
    assert!(harness.decryptor.calls().is_empty());
}

#[tokio::test]
async fn test_secret_write_failure_fails() {
    let harness = Harness::new(
        RecordingObjectStore::with_body("encrypted"),
        RecordingSecretStore::failing(),
        StaticDecryptor::returning(json!({"a": "b"})),
    );

    let result = harness
        .handler
        .on_event(&create_event(base_properties()))
        .await;

    assert_eq!(result, Err(HandlerFailure));
    assert_eq!(harness.decryptor.calls().len(), 1);
}

fn sops_exit_failure() -> SopsDecryptionError {
    SopsDecryptionError::from_exit(
        SopsDecryptionFailureReason::KeyNotFound,
        "sops decryption failed: Failed to get the data key",
        Some(128),
    )
}

#[tokio::test]
async fn test_decrypt_failure_fails_by_default() {
    let harness = Harness::new(
        RecordingObjectStore::with_body("encrypted"),
        RecordingSecretStore::default(),
        StaticDecryptor::failing(sops_exit_failure()),
    );

    let result = harness
        .handler
        .on_event(&create_event(base_properties()))
        .await;

    assert_eq!(result, Err(HandlerFailure));
    assert!(harness.secrets.writes().is_empty());
}

#[tokio::test]
async fn test_empty_policy_continues_with_empty_document() {
    let harness = Harness::new(
        RecordingObjectStore::with_body("encrypted"),
        RecordingSecretStore::default(),
        StaticDecryptor::failing(sops_exit_failure()),
    );
    let handler = harness
        .handler
        .clone()
        .with_failure_policy(DecryptFailurePolicy::Empty);
    let properties = properties_with(json!({
        "Mappings": r#"{"key":{"path":["a"]}}"#,
    }));

    let response = handler.on_event(&create_event(properties)).await.unwrap();

    assert_eq!(response.physical_resource_id, "secretdata_mysecretarn");
    assert_eq!(
        harness.secrets.writes(),
        vec![(SECRET_ARN.to_string(), "{}".to_string())]
    );
}

#[tokio::test]
async fn test_empty_policy_does_not_mask_spawn_failure() {
    let harness = Harness::new(
        RecordingObjectStore::with_body("encrypted"),
        RecordingSecretStore::default(),
        StaticDecryptor::failing(SopsDecryptionError::new(
            SopsDecryptionFailureReason::ProviderUnavailable,
            "Failed to spawn sops",
        )),
    );
    let handler = harness
        .handler
        .clone()
        .with_failure_policy(DecryptFailurePolicy::Empty);

    let result = handler.on_event(&create_event(base_properties())).await;

    assert_eq!(result, Err(HandlerFailure));
    assert!(harness.secrets.writes().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_fails_before_io() {
    let harness = Harness::decrypting_to(json!({}));

    let result = harness.handler.on_payload(b"{not json").await;

    assert_eq!(result, Err(HandlerFailure));
    assert!(harness.objects.calls().is_empty());
    assert!(harness.secrets.writes().is_empty());
}

#[tokio::test]
async fn test_payload_is_decoded_and_handled() {
    let harness = Harness::decrypting_to(json!({"a": "abc"}));
    let event = create_event(properties_with(json!({
        "Mappings": r#"{"key":{"path":["a"]}}"#,
    })));

    let response = harness
        .handler
        .on_payload(event.to_string().as_bytes())
        .await
        .unwrap();

    assert_eq!(response, Response::new("secretdata_mysecretarn"));
    assert_eq!(
        harness.secrets.writes(),
        vec![(SECRET_ARN.to_string(), r#"{"key":"abc"}"#.to_string())]
    );
}

#[tokio::test]
async fn test_whole_file_falsy_data_writes_empty_string() {
    let harness = Harness::decrypting_to(json!({"data": false}));
    let properties = properties_with(json!({"WholeFile": "true"}));

    harness
        .handler
        .on_event(&create_event(properties))
        .await
        .unwrap();

    assert_eq!(
        harness.secrets.writes(),
        vec![(SECRET_ARN.to_string(), String::new())]
    );
}
