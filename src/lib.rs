pub mod api;
pub mod config;
pub mod infrastructure;
pub mod services;

use crate::config::IngestConfig;
use crate::services::ingest::IngestService;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::events::object_finalized,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::events::ObjectFinalizedEvent,
            api::handlers::events::IngestResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "events", description = "Object store notification endpoints"),
        (name = "system", description = "Service health endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub config: IngestConfig,
    pub ingest_permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(ingest: Arc<IngestService>, config: IngestConfig) -> Self {
        let ingest_permits = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            ingest,
            config,
            ingest_permits,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/events/object-finalized",
            post(api::handlers::events::object_finalized).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::webhook_auth,
            )),
        )
        .with_state(state)
}
