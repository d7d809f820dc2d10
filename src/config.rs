//! # Provider Configuration
//!
//! Process-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_LOG_LEVEL, ENV_DECRYPT_FAILURE_POLICY,
    ENV_HTTP_PORT, ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_SOPS_BINARY_PATH,
};
use crate::sops::DecryptFailurePolicy;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

/// Provider-level configuration
///
/// All settings have defaults and can be overridden via environment variables
/// set on the function.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Explicit sops executable, otherwise the bundled or PATH binary is used
    pub sops_binary_path: Option<PathBuf>,
    /// Behaviour when sops exits non-zero
    pub decrypt_failure_policy: DecryptFailurePolicy,
    /// Default log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Enable color in text format logs
    pub log_enable_color: bool,
    /// Port for the `serve` HTTP surface
    pub http_port: u16,
    /// Region override for the AWS clients; the SDK default chain applies otherwise
    pub aws_region: Option<String>,
    /// Ignored values found while loading, logged once tracing is installed
    pub warnings: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            sops_binary_path: None,
            decrypt_failure_policy: DecryptFailurePolicy::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Json,
            log_enable_color: false,
            http_port: DEFAULT_HTTP_PORT,
            aws_region: None,
            warnings: Vec::new(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    ///
    /// Fails when `DECRYPT_FAILURE_POLICY` is set to an unknown value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Fails when `DECRYPT_FAILURE_POLICY` is set to an unknown value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let decrypt_failure_policy = match non_empty(ENV_DECRYPT_FAILURE_POLICY) {
            None => DecryptFailurePolicy::default(),
            Some(raw) => raw.parse::<DecryptFailurePolicy>().map_err(|message| ConfigError::Invalid {
                key: ENV_DECRYPT_FAILURE_POLICY,
                message,
            })?,
        };

        let mut warnings = Vec::new();
        let log_format = parse_or_default(
            ENV_LOG_FORMAT,
            non_empty(ENV_LOG_FORMAT),
            LogFormat::Json,
            &mut warnings,
        );
        let http_port = parse_or_default(
            ENV_HTTP_PORT,
            non_empty(ENV_HTTP_PORT),
            DEFAULT_HTTP_PORT,
            &mut warnings,
        );

        Ok(Self {
            sops_binary_path: non_empty(ENV_SOPS_BINARY_PATH).map(PathBuf::from),
            decrypt_failure_policy,
            log_level: non_empty(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format,
            log_enable_color: non_empty("LOG_ENABLE_COLOR").is_some_and(|v| {
                let v = v.to_lowercase();
                v == "true" || v == "1" || v == "yes" || v == "on"
            }),
            http_port,
            aws_region: non_empty("AWS_REGION"),
            warnings,
        })
    }

    /// Emit the warnings collected while loading
    ///
    /// Loading happens before the subscriber exists, so this runs right after
    /// tracing is initialized.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("{warning}");
        }
    }
}

/// Parse `raw` or fall back to `default`, recording unparseable values
fn parse_or_default<T: FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
    warnings: &mut Vec<String>,
) -> T {
    match raw {
        None => default,
        Some(v) => v.parse().unwrap_or_else(|_| {
            warnings.push(format!("Ignoring invalid value {v:?} for {key}, using default"));
            default
        }),
    }
}
