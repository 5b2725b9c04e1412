use super::{ObjectStore, StoredObject};
use crate::config::Config;
use crate::error::StorageError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::{debug, info};

/// S3 bucket through `aws-sdk-s3`
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    sse_kms: bool,
}

impl S3ObjectStore {
    /// Wrap an existing client
    #[must_use]
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            bucket: config.bucket_name.clone(),
            sse_kms: config.sse_kms,
        }
    }

    /// Client for the configured region, credentials from the default chain
    pub async fn from_config(config: &Config) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        Self::new(Client::new(&sdk_config), config)
    }
}

fn backend<E>(operation: &'static str, key: &str, error: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::Backend {
        operation,
        key: key.to_owned(),
        reason: DisplayErrorContext(error).to_string(),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, local_file: &Path) -> Result<(), StorageError> {
        let body = ByteStream::from_path(local_file)
            .await
            .map_err(|e| backend("put", key, e))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body);
        if self.sse_kms {
            request = request.server_side_encryption(ServerSideEncryption::AwsKms);
        }

        let output = request.send().await.map_err(|e| backend("put", key, e))?;
        debug!(bucket = %self.bucket, key, etag = ?output.e_tag(), "uploaded object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound {
                        bucket: self.bucket.clone(),
                        key: key.to_owned(),
                    }
                } else {
                    backend("get", key, e)
                }
            })?;

        let content_type = output.content_type().map(str::to_owned);
        info!(key, content_type = ?content_type, "downloaded object");
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| backend("get", key, e))?
            .into_bytes()
            .to_vec();

        Ok(StoredObject {
            bytes,
            content_type,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| backend("delete", key, e))?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StorageError> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| backend("list", "*", e))?;
        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name())
            .map(str::to_owned)
            .collect())
    }
}
