//! # SOPS Secrets Manager Provider
//!
//! Custom resource provider that turns a SOPS-encrypted file in S3 into an
//! AWS Secrets Manager secret value.
//!
//! ## Overview
//!
//! For each Create or Update lifecycle event the provider:
//!
//! 1. **Fetches the file** - Reads the encrypted object from S3
//! 2. **Decrypts it** - Pipes the content through the `sops` binary
//! 3. **Extracts values** - Whole file, a single value, or a named mapping set
//! 4. **Writes the secret** - Puts the resulting string into Secrets Manager
//!
//! Delete performs no I/O. The entry point is [`LifecycleHandler::on_event`].

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod handler;
pub mod mapping;
pub mod observability;
pub mod properties;
pub mod provider;
pub mod runtime;
pub mod server;
pub mod sops;

pub use config::ProviderConfig;
pub use error::{HandlerFailure, ProviderError};
pub use event::{LifecycleEvent, Response};
pub use handler::LifecycleHandler;
pub use properties::{Mapping, MappingEncoding, ResourceProperties};
