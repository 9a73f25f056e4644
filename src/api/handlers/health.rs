use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Whether the external image converter answers on this host
    pub converter: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    // The store client is built eagerly at startup; the converter binary is
    // the only dependency that can disappear under a running service.
    let converter = if state.ingest.transcoder_available().await {
        "ready"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        converter: converter.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
