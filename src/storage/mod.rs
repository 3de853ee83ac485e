//! Object storage for uploaded PDFs, S3 or any S3-compatible store.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};
use tracing::warn;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::core::errors::{AppError, AppResult};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores the file and returns its storage key.
    async fn upload(&self, bytes: &[u8], filename: &str, content_type: &str) -> AppResult<String>;

    /// Time-limited GET URL for a stored object.
    async fn presigned_url(&self, storage_key: &str, expires_in: Duration) -> AppResult<String>;

    /// Best-effort delete; false means the object could not be removed.
    async fn delete(&self, storage_key: &str) -> AppResult<bool>;
}

pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3ObjectStorage {
    pub fn new(settings: &Settings) -> Self {
        let credentials = Credentials::new(
            settings.aws_access_key_id.clone(),
            settings.aws_secret_access_key.clone(),
            None,
            None,
            "formlift",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(settings.aws_region.clone()))
            .behavior_version_latest();
        if let Some(endpoint) = &settings.s3_endpoint {
            // MinIO requires path-style addressing.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: settings.s3_bucket.clone(),
            prefix: settings.upload_prefix.clone(),
        }
    }

    /// Unique key under the configured prefix, preserving the file extension.
    fn object_key(&self, filename: &str) -> String {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        format!("{}{}{}", self.prefix, Uuid::new_v4(), extension)
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn upload(&self, bytes: &[u8], filename: &str, content_type: &str) -> AppResult<String> {
        let key = self.object_key(filename);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|err| AppError::Storage(err.to_string()))?;
        Ok(key)
    }

    async fn presigned_url(&self, storage_key: &str, expires_in: Duration) -> AppResult<String> {
        let config =
            PresigningConfig::expires_in(expires_in).map_err(|err| AppError::Storage(err.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .presigned(config)
            .await
            .map_err(|err| AppError::Storage(err.to_string()))?;
        Ok(request.uri().to_string())
    }

    async fn delete(&self, storage_key: &str) -> AppResult<bool> {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                warn!(storage_key, error = %err, "failed to delete stored object");
                Ok(false)
            }
        }
    }
}
