//! Documents in an S3 bucket

use super::{DOCUMENT_CONTENT_TYPE, StateStore, decode_document, document_key};
use crate::aws::S3Client;
use crate::error::RotateError;
use anyhow::{Context, Result};
use rds_rotate_common::RotationState;
use tracing::debug;

#[derive(Clone)]
pub struct S3StateStore {
    s3: S3Client,
    bucket: String,
}

impl S3StateStore {
    pub fn new(s3: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            s3,
            bucket: bucket.into(),
        }
    }

    pub fn location(&self, name: &str) -> String {
        format!("s3://{}/{}", self.bucket, document_key(name))
    }
}

impl StateStore for S3StateStore {
    async fn load(&self, name: &str) -> Result<RotationState> {
        let key = document_key(name);
        let bytes = self
            .s3
            .get_bytes(&self.bucket, &key)
            .await?
            .ok_or_else(|| RotateError::StateNotFound { key: key.clone() })?;

        debug!(bucket = %self.bucket, key = %key, size = bytes.len(), "Loaded rotation document");
        decode_document(&bytes).with_context(|| format!("Failed to parse {}", self.location(name)))
    }

    async fn save(&self, name: &str, state: &RotationState) -> Result<()> {
        let key = document_key(name);
        let yaml = state.to_yaml().map_err(RotateError::Configuration)?;
        self.s3
            .upload_bytes(&self.bucket, &key, yaml.into_bytes(), DOCUMENT_CONTENT_TYPE)
            .await?;
        debug!(bucket = %self.bucket, key = %key, "Saved rotation document");
        Ok(())
    }
}
