//! # SOPS Errors
//!
//! Decryption failures and their classification.
//!
//! The classification is diagnostic only. It feeds logs and the error
//! metric label; it never changes what the invoking framework sees.

use thiserror::Error;

/// Why a sops invocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SopsDecryptionFailureReason {
    /// No key able to decrypt the data key was available
    KeyNotFound,
    /// A key was available but did not match the file
    WrongKey,
    /// The declared input type does not match the content
    UnsupportedFormat,
    /// The KMS key identifier or encryption context is malformed
    InvalidKeyFormat,
    /// MAC mismatch or unreadable sops metadata
    CorruptedFile,
    /// The execution role may not use the key
    PermissionDenied,
    /// KMS could not be reached in time
    NetworkTimeout,
    /// The sops binary could not be found or started
    ProviderUnavailable,
    /// sops succeeded but did not print a JSON document
    InvalidOutput,
    Unknown,
}

impl SopsDecryptionFailureReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SopsDecryptionFailureReason::KeyNotFound => "key_not_found",
            SopsDecryptionFailureReason::WrongKey => "wrong_key",
            SopsDecryptionFailureReason::UnsupportedFormat => "unsupported_format",
            SopsDecryptionFailureReason::InvalidKeyFormat => "invalid_key_format",
            SopsDecryptionFailureReason::CorruptedFile => "corrupted_file",
            SopsDecryptionFailureReason::PermissionDenied => "permission_denied",
            SopsDecryptionFailureReason::NetworkTimeout => "network_timeout",
            SopsDecryptionFailureReason::ProviderUnavailable => "provider_unavailable",
            SopsDecryptionFailureReason::InvalidOutput => "invalid_output",
            SopsDecryptionFailureReason::Unknown => "unknown",
        }
    }

    /// Would the same invocation plausibly succeed if run again
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SopsDecryptionFailureReason::NetworkTimeout
                | SopsDecryptionFailureReason::ProviderUnavailable
        )
    }

    #[must_use]
    pub fn remediation(&self) -> &'static str {
        match self {
            SopsDecryptionFailureReason::KeyNotFound => {
                "Check that the file was encrypted with the KMS key passed as KMSKeyArn and that the key still exists"
            }
            SopsDecryptionFailureReason::WrongKey => {
                "Re-encrypt the file with the KMS key the provider is configured to use"
            }
            SopsDecryptionFailureReason::UnsupportedFormat => {
                "Set FileType explicitly or give the object key an extension sops understands (yaml, json, dotenv, ini, binary)"
            }
            SopsDecryptionFailureReason::InvalidKeyFormat => {
                "Verify KMSKeyArn is a full KMS key ARN"
            }
            SopsDecryptionFailureReason::CorruptedFile => {
                "The encrypted file or its sops metadata was modified after encryption; re-encrypt it"
            }
            SopsDecryptionFailureReason::PermissionDenied => {
                "Grant the provider's execution role kms:Decrypt on the key"
            }
            SopsDecryptionFailureReason::NetworkTimeout => {
                "KMS was unreachable; check VPC endpoints or NAT and retry the deployment"
            }
            SopsDecryptionFailureReason::ProviderUnavailable => {
                "Bundle the sops binary next to the provider or set SOPS_BINARY_PATH"
            }
            SopsDecryptionFailureReason::InvalidOutput => {
                "Check the sops version; it must support --output-type json"
            }
            SopsDecryptionFailureReason::Unknown => "Inspect the sops stderr in the provider logs",
        }
    }
}

/// A failed decryption
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SopsDecryptionError {
    pub reason: SopsDecryptionFailureReason,
    pub message: String,
    /// Process exit code, if sops ran and exited on its own
    pub exit_code: Option<i32>,
    /// sops ran to completion and reported failure
    pub exited_with_failure: bool,
}

impl SopsDecryptionError {
    pub fn new(reason: SopsDecryptionFailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            exit_code: None,
            exited_with_failure: false,
        }
    }

    /// Mark this error as a non-zero sops exit
    #[must_use]
    pub fn from_exit(
        reason: SopsDecryptionFailureReason,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            reason,
            message: message.into(),
            exit_code,
            exited_with_failure: true,
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.reason.is_transient()
    }

    #[must_use]
    pub fn remediation(&self) -> &'static str {
        self.reason.remediation()
    }
}

/// Classify a sops failure from its stderr and exit code
///
/// Message patterns take priority; the exit code is only consulted when no
/// pattern matches.
#[must_use]
pub fn classify_sops_error(stderr: &str, exit_code: Option<i32>) -> SopsDecryptionFailureReason {
    let msg = stderr.to_lowercase();
    let has = |patterns: &[&str]| patterns.iter().any(|p| msg.contains(p));

    if has(&["accessdenied", "access denied", "not authorized", "permission denied"]) {
        return SopsDecryptionFailureReason::PermissionDenied;
    }
    if has(&["timeout", "timed out", "connection refused", "no such host"]) {
        return SopsDecryptionFailureReason::NetworkTimeout;
    }
    if has(&["invalid key", "malformed key", "invalid arn", "invalidarnexception"]) {
        return SopsDecryptionFailureReason::InvalidKeyFormat;
    }
    if has(&["wrong key", "incorrectkeyexception"]) {
        return SopsDecryptionFailureReason::WrongKey;
    }
    if has(&[
        "no decryption key",
        "key not found",
        "failed to get the data key",
        "notfoundexception",
    ]) {
        return SopsDecryptionFailureReason::KeyNotFound;
    }
    if has(&["mac mismatch", "corrupt", "sops metadata not found"]) {
        return SopsDecryptionFailureReason::CorruptedFile;
    }
    if has(&[
        "unsupported format",
        "unknown file type",
        "error unmarshalling input",
        "could not unmarshal",
    ]) {
        return SopsDecryptionFailureReason::UnsupportedFormat;
    }

    match exit_code {
        Some(128 | 111) => SopsDecryptionFailureReason::KeyNotFound,
        Some(24 | 25) => SopsDecryptionFailureReason::WrongKey,
        Some(51 | 52) => SopsDecryptionFailureReason::CorruptedFile,
        Some(6) => SopsDecryptionFailureReason::InvalidKeyFormat,
        _ => SopsDecryptionFailureReason::Unknown,
    }
}
