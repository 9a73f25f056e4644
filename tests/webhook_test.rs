use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use image_ingest::config::IngestConfig;
use image_ingest::services::ingest::IngestService;
use image_ingest::services::storage::StorageService;
use image_ingest::services::transcoder::NoopTranscoder;
use image_ingest::{AppState, create_app};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// Mock Storage Helper from ingest_pipeline_test.rs
struct MockStorageService {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MockStorageService {
    fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
        }
    }

    fn with_object(bucket: &str, key: &str, data: &[u8]) -> Self {
        let storage = Self::new();
        storage
            .objects
            .lock()
            .unwrap()
            .insert(format!("{}/{}", bucket, key), data.to_vec());
        storage
    }

    fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&format!("{}/{}", bucket, key))
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn download_to_path(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> anyhow::Result<()> {
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(&format!("{}/{}", bucket, key))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("object {} not found", key))?;
        tokio::fs::write(dest, data).await?;
        Ok(())
    }

    async fn upload_from_path(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        _content_type: Option<&str>,
    ) -> anyhow::Result<()> {
        let data = tokio::fs::read(src).await?;
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{}/{}", bucket, key), data);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> anyhow::Result<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&format!("{}/{}", bucket, key));
        Ok(())
    }
}

fn test_state(storage: Arc<MockStorageService>, webhook_token: Option<&str>) -> AppState {
    let mut config = IngestConfig::development();
    config.webhook_token = webhook_token.map(|t| t.to_string());

    let ingest = Arc::new(IngestService::new(
        storage,
        Arc::new(NoopTranscoder),
        config.clone(),
    ));

    AppState::new(ingest, config)
}

fn event_request(token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/events/object-finalized")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = create_app(test_state(Arc::new(MockStorageService::new()), None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["converter"], "ready");
}

#[tokio::test]
async fn rejects_events_without_webhook_token() {
    let storage = Arc::new(MockStorageService::with_object(
        "uploads",
        "photos/pic.png",
        b"png-bytes",
    ));
    let app = create_app(test_state(storage.clone(), Some("s3cret")));

    let response = app
        .oneshot(event_request(
            None,
            json!({"bucket": "uploads", "name": "photos/pic.png", "contentType": "image/png"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    // Nothing was ingested.
    assert!(storage.contains("uploads", "photos/pic.png"));
    assert!(!storage.contains("uploads", "photos/pic.webp"));
}

#[tokio::test]
async fn reports_skip_for_non_image_events() {
    let app = create_app(test_state(Arc::new(MockStorageService::new()), Some("s3cret")));

    let response = app
        .oneshot(event_request(
            Some("s3cret"),
            json!({"bucket": "uploads", "name": "docs/report.pdf", "contentType": "application/pdf"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "skipped");
    assert_eq!(body["reason"], "not an image");
}

#[tokio::test]
async fn processes_image_events_end_to_end() {
    let storage = Arc::new(MockStorageService::with_object(
        "uploads",
        "photos/pic.png",
        b"png-bytes",
    ));
    let app = create_app(test_state(storage.clone(), None));

    let response = app
        .oneshot(event_request(
            None,
            json!({"bucket": "uploads", "name": "photos/pic.png", "contentType": "image/png"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "processed");
    assert_eq!(body["output"], "photos/pic.webp");
    assert_eq!(body["thumbnail"], "photos/thumbnail_pic.webp");

    assert!(storage.contains("uploads", "photos/pic.webp"));
    assert!(storage.contains("uploads", "photos/thumbnail_pic.webp"));
    assert!(!storage.contains("uploads", "photos/pic.png"));
}

#[tokio::test]
async fn rejects_events_with_empty_object_name() {
    let app = create_app(test_state(Arc::new(MockStorageService::new()), None));

    let response = app
        .oneshot(event_request(
            None,
            json!({"bucket": "uploads", "name": "", "contentType": "image/png"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_source_object_fails_the_invocation() {
    let app = create_app(test_state(Arc::new(MockStorageService::new()), None));

    let response = app
        .oneshot(event_request(
            None,
            json!({"bucket": "uploads", "name": "photos/missing.png", "contentType": "image/png"}),
        ))
        .await
        .unwrap();

    // Propagated so the notifier's retry policy applies.
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
