//! # SOPS Decryption
//!
//! Runs the sops binary as a subprocess to decrypt file content.
//!
//! Encrypted content is piped to sops on stdin and the decrypted document is
//! read back from stdout as JSON. Nothing is written to disk. The sops
//! binary resolves KMS credentials from the process environment, exactly as
//! the AWS SDK clients do.

pub mod error;

use crate::constants::{SOPS_BINARY_NAME, SOPS_STDERR_TRUNCATE_BYTES};
use crate::observability::metrics;
use async_trait::async_trait;
use error::{classify_sops_error, SopsDecryptionError, SopsDecryptionFailureReason};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info_span, warn, Instrument};
use zeroize::Zeroizing;

/// What to do when sops exits with a non-zero status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecryptFailurePolicy {
    /// Fail the invocation
    #[default]
    Fail,
    /// Continue as if sops had decrypted an empty object
    Empty,
}

impl DecryptFailurePolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DecryptFailurePolicy::Fail => "fail",
            DecryptFailurePolicy::Empty => "empty",
        }
    }
}

impl FromStr for DecryptFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(DecryptFailurePolicy::Fail),
            "empty" => Ok(DecryptFailurePolicy::Empty),
            other => Err(format!(
                "invalid decryption failure policy {other:?}, expected \"fail\" or \"empty\""
            )),
        }
    }
}

/// Turns encrypted file content into a decrypted JSON document
#[async_trait]
pub trait Decryptor: Send + Sync {
    /// Decrypt `content`, declared as `input_type`, optionally with a KMS key
    async fn decrypt(
        &self,
        content: &str,
        input_type: &str,
        kms_key_arn: Option<&str>,
    ) -> Result<Value, SopsDecryptionError>;
}

/// Arguments passed to sops for one decryption
#[must_use]
pub fn sops_args(input_type: &str, kms_key_arn: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "-d".to_string(),
        "--input-type".to_string(),
        input_type.to_string(),
        "--output-type".to_string(),
        "json".to_string(),
    ];
    if let Some(kms) = kms_key_arn {
        args.push("--kms".to_string());
        args.push(kms.to_string());
    }
    args.push("/dev/stdin".to_string());
    args
}

/// [`Decryptor`] backed by the sops executable
#[derive(Debug, Clone)]
pub struct SopsDecryptor {
    binary: PathBuf,
}

impl SopsDecryptor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Find the sops binary
    ///
    /// Order: explicit path, `sops` next to the running executable, `sops`
    /// in PATH.
    ///
    /// # Errors
    ///
    /// Returns [`SopsDecryptionFailureReason::ProviderUnavailable`] when no
    /// candidate exists.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, SopsDecryptionError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(SopsDecryptionError::new(
                    SopsDecryptionFailureReason::ProviderUnavailable,
                    format!("configured sops binary {} does not exist", path.display()),
                ));
            }
            return Ok(Self::new(path));
        }

        if let Some(bundled) = bundled_binary() {
            return Ok(Self::new(bundled));
        }

        which::which(SOPS_BINARY_NAME).map(Self::new).map_err(|e| {
            SopsDecryptionError::new(
                SopsDecryptionFailureReason::ProviderUnavailable,
                format!("sops binary not found next to the provider or in PATH: {e}"),
            )
        })
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    async fn run(
        &self,
        content: &str,
        input_type: &str,
        kms_key_arn: Option<&str>,
    ) -> Result<Value, SopsDecryptionError> {
        debug!(binary = %self.binary.display(), input_type, "Spawning sops");

        let mut child = Command::new(&self.binary)
            .args(sops_args(input_type, kms_key_arn))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SopsDecryptionError::new(
                    SopsDecryptionFailureReason::ProviderUnavailable,
                    format!("Failed to spawn sops at {}: {e}", self.binary.display()),
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = async {
                stdin.write_all(content.as_bytes()).await?;
                stdin.shutdown().await
            }
            .await;
            // sops may exit before reading everything; its exit status says why
            if let Err(e) = written {
                if e.kind() == io::ErrorKind::BrokenPipe {
                    debug!("sops closed stdin before all content was written");
                } else {
                    return Err(SopsDecryptionError::new(
                        SopsDecryptionFailureReason::Unknown,
                        format!("Failed to write encrypted content to sops stdin: {e}"),
                    ));
                }
            }
        }

        let output = child.wait_with_output().await.map_err(|e| {
            SopsDecryptionError::new(
                SopsDecryptionFailureReason::Unknown,
                format!("Failed to wait for sops: {e}"),
            )
        })?;
        let stdout = Zeroizing::new(output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let exit_code = output.status.code();
            warn!(exit_code = ?exit_code, stderr = %stderr, "sops exited with failure");
            let reason = classify_sops_error(&stderr, exit_code);
            return Err(SopsDecryptionError::from_exit(
                reason,
                format!(
                    "sops decryption failed: {} (exit code: {exit_code:?})",
                    truncate(stderr.trim(), SOPS_STDERR_TRUNCATE_BYTES)
                ),
                exit_code,
            ));
        }

        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr, "sops wrote diagnostics to stderr");
        }

        serde_json::from_slice(&stdout).map_err(|e| {
            SopsDecryptionError::new(
                SopsDecryptionFailureReason::InvalidOutput,
                format!("sops output is not valid JSON: {e}"),
            )
        })
    }
}

#[async_trait]
impl Decryptor for SopsDecryptor {
    async fn decrypt(
        &self,
        content: &str,
        input_type: &str,
        kms_key_arn: Option<&str>,
    ) -> Result<Value, SopsDecryptionError> {
        let span = info_span!(
            "sops.decrypt",
            file.size = content.len(),
            file.input_type = input_type,
            kms = kms_key_arn.is_some()
        );
        let start = Instant::now();

        async move {
            let result = self.run(content, input_type, kms_key_arn).await;
            metrics::increment_sops_decryption_total();
            metrics::observe_sops_decryption_duration(start.elapsed().as_secs_f64());

            if let Err(e) = &result {
                metrics::increment_sops_decryption_errors(e.reason.as_str());
                if e.is_transient() {
                    warn!(
                        reason = e.reason.as_str(),
                        "SOPS decryption failed (transient): {e}"
                    );
                } else {
                    error!(
                        reason = e.reason.as_str(),
                        remediation = e.remediation(),
                        "SOPS decryption failed (permanent): {e}"
                    );
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}

fn bundled_binary() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let candidate = exe.parent()?.join(SOPS_BINARY_NAME);
    candidate.is_file().then_some(candidate)
}

/// Cut `s` to at most `max` bytes on a char boundary
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, see logs for full error)", &s[..end])
}
