//! S3 object access for rotation documents

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::error::AwsError;
use anyhow::{Context, Result};
use aws_sdk_s3::{Client, primitives::ByteStream};
use tracing::debug;

/// S3 client for reading and writing rotation documents
#[derive(Clone)]
pub struct S3Client {
    client: Client,
}

impl FromAwsContext for S3Client {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.s3_client(),
        }
    }
}

impl S3Client {
    /// Download an object, `None` if the key does not exist
    pub async fn get_bytes(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        debug!(bucket = %bucket, key = %key, "Downloading object");

        let response = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(response) => response,
            Err(e) => {
                let err = AwsError::from_sdk(&e);
                if err.is_not_found() {
                    return Ok(None);
                }
                return Err(err).with_context(|| format!("Failed to get s3://{bucket}/{key}"));
            }
        };

        let body = response
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read body of s3://{bucket}/{key}"))?;

        Ok(Some(body.into_bytes().to_vec()))
    }

    /// Upload bytes to S3
    pub async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        debug!(bucket = %bucket, key = %key, size = data.len(), "Uploading bytes");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .with_context(|| format!("Failed to upload s3://{bucket}/{key}"))?;

        Ok(())
    }
}
