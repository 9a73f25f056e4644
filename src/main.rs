use clap::Parser;
use dotenvy::dotenv;
use image_ingest::config::IngestConfig;
use image_ingest::infrastructure::{storage, transcoder};
use image_ingest::services::ingest::IngestService;
use image_ingest::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the notification endpoint
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initial Environment & Logging Setup
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_ingest=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Image Ingest Service...");

    // 2. Setup Common Infrastructure
    let config = IngestConfig::from_env();
    info!(
        "🖼️  Ingest Config: quality={}, thumbnail={}x{}, concurrency={}, quick folder='{}'",
        config.webp_quality,
        config.thumbnail_max_width,
        config.thumbnail_max_height,
        config.max_concurrency,
        config.quick_content_folder
    );

    let storage_service = storage::setup_storage().await;
    let transcoder_service = transcoder::setup_transcoder(&config).await;

    let ingest = Arc::new(IngestService::new(
        storage_service,
        transcoder_service,
        config.clone(),
    ));

    let state = AppState::new(ingest, config);

    // Configure tracing layer for HTTP requests
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ Notification endpoint listening on: http://0.0.0.0:{}", args.port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Server runtime error: {}", e);
    }

    info!("👋 Image ingest exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
