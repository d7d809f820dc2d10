//! # Errors
//!
//! Error taxonomy for a single lifecycle invocation.
//!
//! Every error is fatal to the invocation and none is retried locally. The
//! handler converts all of them into the opaque [`HandlerFailure`] at its top
//! boundary; the rich variants below only ever reach the diagnostic log.

use crate::sops::error::SopsDecryptionError;
use thiserror::Error;

/// Malformed or missing input, detected before any I/O happens
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("event is not valid JSON")]
    MalformedEvent(#[source] serde_json::Error),

    #[error("event must be a JSON object")]
    EventNotObject,

    #[error("missing required field {0}")]
    MissingField(&'static str),

    #[error("field {field} must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("unexpected value {value:?} when normalising boolean field {field}")]
    InvalidBoolean { field: &'static str, value: String },

    #[error("field {field} is not valid JSON")]
    InvalidJson {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("mapping {name} is malformed")]
    InvalidMapping {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("mapping {name} has an empty path")]
    EmptyMappingPath { name: String },

    #[error("mapping {name} has unknown encoding {encoding:?}")]
    UnknownEncoding { name: String, encoding: String },

    #[error("unknown request type {0:?}")]
    UnknownRequestType(String),
}

/// Failure talking to object storage or the secret store
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to get object s3://{bucket}/{key}: {message}")]
    ObjectFetch {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("failed to read body of s3://{bucket}/{key}: {message}")]
    ObjectBody {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("failed to put secret value for {secret_id}: {message}")]
    SecretWrite { secret_id: String, message: String },
}

/// Any failure inside the lifecycle chain
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Decryption(#[from] SopsDecryptionError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("object s3://{bucket}/{key} is not valid UTF-8")]
    Decode {
        bucket: String,
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("failed to serialize mapped values")]
    Output(#[source] serde_json::Error),
}

impl ProviderError {
    /// Taxonomy name used as `error.name` in logs and as a metric label
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Validation(_) => "ValidationError",
            ProviderError::Decryption(_) => "DecryptionError",
            ProviderError::Transport(_) => "TransportError",
            ProviderError::Decode { .. } => "DecodeError",
            ProviderError::Output(_) => "OutputError",
        }
    }
}

/// The only failure signal handed back to the invoking framework
///
/// Carries no detail; the cause is only logged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Failed")]
pub struct HandlerFailure;
