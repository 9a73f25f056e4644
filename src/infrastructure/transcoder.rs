use crate::config::IngestConfig;
use crate::services::transcoder::{ImageTranscoder, create_transcoder};
use std::sync::Arc;
use tracing::info;

pub async fn setup_transcoder(config: &IngestConfig) -> Arc<dyn ImageTranscoder> {
    let transcoder = create_transcoder(
        &config.transcoder_type,
        config.convert_binary.clone(),
        config.webp_quality,
        config.thumbnail_max_width,
        config.thumbnail_max_height,
    );

    if config.transcoder_type == "noop" {
        tracing::warn!("⚠️  Noop transcoder selected, images will be republished unconverted");
    } else if transcoder.health_check().await {
        info!("🎨 Image converter '{}' is ready", config.convert_binary);
    } else {
        tracing::warn!(
            "⚠️  Image converter '{}' unreachable! Ingest events will fail until it is installed.",
            config.convert_binary
        );
    }

    transcoder
}
