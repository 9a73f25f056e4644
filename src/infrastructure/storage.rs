use crate::services::storage::{S3StorageService, StorageService};
use aws_sdk_s3::config::{Credentials, Region};
use std::env;
use std::sync::Arc;
use tracing::info;

/// Build the process-wide store client.
///
/// Constructed once at startup and shared across invocations for the
/// lifetime of the process; there is no teardown. The bucket is not
/// pinned here: every notification names its own bucket.
pub async fn setup_storage() -> Arc<dyn StorageService> {
    let endpoint_url = env::var("MINIO_ENDPOINT").expect("MINIO_ENDPOINT must be set");
    let access_key = env::var("MINIO_ACCESS_KEY").expect("MINIO_ACCESS_KEY must be set");
    let secret_key = env::var("MINIO_SECRET_KEY").expect("MINIO_SECRET_KEY must be set");
    let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

    info!("☁️  Object store endpoint: {} (region: {})", endpoint_url, region);

    let credentials = Credentials::new(access_key, secret_key, None, None, "static");
    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new(region))
        .credentials_provider(credentials)
        .load()
        .await;

    // MinIO addresses buckets on the path, not as subdomains.
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let client = aws_sdk_s3::Client::from_conf(s3_config);
    Arc::new(S3StorageService::new(client))
}
