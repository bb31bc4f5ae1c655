//! Rotation document persistence
//!
//! Each deployment's document is stored under the key `<name>.yml`, either in
//! an S3 bucket or in a local directory.

mod local;
mod s3;

pub use local::LocalStateStore;
pub use s3::S3StateStore;

use crate::error::RotateError;
use anyhow::Result;
use rds_rotate_common::RotationState;
use std::future::Future;

/// Content type for stored documents
pub const DOCUMENT_CONTENT_TYPE: &str = "application/x-yaml";

/// Storage key for a deployment's document
pub fn document_key(name: &str) -> String {
    format!("{name}.yml")
}

/// Parse stored bytes, mapping YAML errors to a configuration error.
pub fn decode_document(bytes: &[u8]) -> Result<RotationState> {
    Ok(RotationState::from_yaml(bytes).map_err(RotateError::Configuration)?)
}

/// Load and save rotation documents by deployment name.
///
/// `load` fails with [`RotateError::StateNotFound`] when nothing is stored
/// under the name. `save` replaces the whole document.
pub trait StateStore: Send + Sync {
    fn load(&self, name: &str) -> impl Future<Output = Result<RotationState>> + Send;

    fn save(&self, name: &str, state: &RotationState) -> impl Future<Output = Result<()>> + Send;
}

/// Store selected at startup
pub enum StateBackend {
    S3(S3StateStore),
    Local(LocalStateStore),
}

impl StateBackend {
    /// Human-readable location of a document, for logs
    pub fn location(&self, name: &str) -> String {
        match self {
            StateBackend::S3(store) => store.location(name),
            StateBackend::Local(store) => store.path(name).display().to_string(),
        }
    }
}

impl StateStore for StateBackend {
    async fn load(&self, name: &str) -> Result<RotationState> {
        match self {
            StateBackend::S3(store) => store.load(name).await,
            StateBackend::Local(store) => store.load(name).await,
        }
    }

    async fn save(&self, name: &str, state: &RotationState) -> Result<()> {
        match self {
            StateBackend::S3(store) => store.save(name, state).await,
            StateBackend::Local(store) => store.save(name, state).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_key() {
        assert_eq!(document_key("orders"), "orders.yml");
    }

    #[test]
    fn test_decode_invalid_yaml_is_configuration_error() {
        let err = decode_document(b"sourceIdentifier: [unterminated").unwrap_err();
        assert!(matches!(
            RotateError::find(&err),
            Some(RotateError::Configuration(_))
        ));
    }
}
