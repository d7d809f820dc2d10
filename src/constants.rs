//! # Constants
//!
//! Shared constants used throughout the provider.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Prefix of the PhysicalResourceId derived on Create (`secretdata_<SecretArn>`)
pub const PHYSICAL_RESOURCE_ID_PREFIX: &str = "secretdata_";

/// Name of the sops executable searched next to the running binary and in PATH
pub const SOPS_BINARY_NAME: &str = "sops";

/// Input type handed to sops when the whole file was encrypted as a binary blob
pub const WHOLE_FILE_INPUT_TYPE: &str = "json";

/// sops stderr longer than this is truncated in error messages (full text is logged)
pub const SOPS_STDERR_TRUNCATE_BYTES: usize = 500;

/// Default HTTP server port for `serve`
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default log level when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the sops executable path
pub const ENV_SOPS_BINARY_PATH: &str = "SOPS_BINARY_PATH";

/// Environment variable selecting the decryption failure policy
pub const ENV_DECRYPT_FAILURE_POLICY: &str = "DECRYPT_FAILURE_POLICY";

pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
pub const ENV_HTTP_PORT: &str = "HTTP_PORT";
