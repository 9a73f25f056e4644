use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;
use crate::api::error::AppError;
use crate::services::ingest::{IngestOutcome, ObjectEvent};

/// An object-finalized notification, as configured on the bucket.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFinalizedEvent {
    /// The storage bucket that contains the file
    pub bucket: String,
    /// File path in the bucket
    pub name: String,
    /// File content type
    pub content_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    /// "processed" or "skipped"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[utoipa::path(
    post,
    path = "/events/object-finalized",
    request_body = ObjectFinalizedEvent,
    responses(
        (status = 200, description = "Event handled", body = IngestResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Pipeline failure, notifier should redeliver")
    ),
    tag = "events"
)]
pub async fn object_finalized(
    State(state): State<AppState>,
    Json(event): Json<ObjectFinalizedEvent>,
) -> Result<Json<IngestResponse>, AppError> {
    if event.name.is_empty() {
        return Err(AppError::BadRequest("object name is empty".to_string()));
    }

    // Bounds how many pipelines run at once; waiting events queue here.
    let _permit = state
        .ingest_permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| AppError::Internal("ingest semaphore closed".to_string()))?;

    let event = ObjectEvent {
        bucket: event.bucket,
        key: event.name,
        content_type: event.content_type,
    };

    match state.ingest.process(&event).await? {
        IngestOutcome::Skipped(reason) => Ok(Json(IngestResponse {
            status: "skipped".to_string(),
            reason: Some(reason.as_str().to_string()),
            output: None,
            thumbnail: None,
        })),
        IngestOutcome::Processed {
            output_key,
            thumbnail_key,
        } => Ok(Json(IngestResponse {
            status: "processed".to_string(),
            reason: None,
            output: Some(output_key),
            thumbnail: thumbnail_key,
        })),
    }
}
