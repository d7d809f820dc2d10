//! # Provider Modules
//!
//! Storage collaborators of the lifecycle handler.
//!
//! - `ObjectStoreProvider` fetches the encrypted file
//! - `SecretManagerProvider` persists the resulting secret string

use crate::error::TransportError;
use async_trait::async_trait;

/// Provider trait for object storage
#[async_trait]
pub trait ObjectStoreProvider: Send + Sync {
    /// Fetch the full body of `key` in `bucket`
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, TransportError>;
}

/// Provider trait for cloud secret managers
#[async_trait]
pub trait SecretManagerProvider: Send + Sync {
    /// Replace the full value of an existing secret
    ///
    /// Writing the same value twice leaves the secret in the same state.
    async fn put_secret_value(&self, secret_id: &str, secret_value: &str)
        -> Result<(), TransportError>;
}

// Provider implementations
pub mod aws;
