use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Fetch the full object into a local file.
    async fn download_to_path(&self, bucket: &str, key: &str, dest: &Path) -> Result<()>;

    /// Upload a local file to `key`, with optional content-type metadata.
    async fn upload_from_path(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        content_type: Option<&str>,
    ) -> Result<()>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

pub struct S3StorageService {
    client: Client,
}

impl S3StorageService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn download_to_path(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let res = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("failed to fetch {} from bucket {}", key, bucket))?;

        let body = res
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read object body for {}", key))?;

        tokio::fs::write(dest, body.into_bytes())
            .await
            .with_context(|| format!("failed to write scratch file {}", dest.display()))?;

        Ok(())
    }

    async fn upload_from_path(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        content_type: Option<&str>,
    ) -> Result<()> {
        let body = ByteStream::from_path(src)
            .await
            .with_context(|| format!("failed to open {} for upload", src.display()))?;

        let mut req = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body);

        if let Some(content_type) = content_type {
            req = req.content_type(content_type);
        }

        req.send()
            .await
            .with_context(|| format!("failed to upload {} to bucket {}", key, bucket))?;

        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("failed to delete {} from bucket {}", key, bucket))?;

        Ok(())
    }
}
