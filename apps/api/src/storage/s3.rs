use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

use crate::storage::{to_document_bytes, DocumentStore, StoreError};

/// Documents stored as objects in a single S3 (or MinIO) bucket, keyed by name.
#[derive(Clone)]
pub struct S3DocumentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3DocumentStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn read_document(&self, name: &str) -> Result<serde_json::Value, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StoreError::NotFound(name.to_string())
                } else {
                    StoreError::Backend(format!("S3 download failed: {service_error}"))
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Backend(format!("S3 body read failed: {e}")))?
            .into_bytes();

        info!("Downloaded s3://{}/{}", self.bucket, name);
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_document(
        &self,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let body = bytes::Bytes::from(to_document_bytes(value)?);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("S3 upload failed: {e}")))?;

        info!("File {name} uploaded to s3://{}", self.bucket);
        Ok(())
    }
}
