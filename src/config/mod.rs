use std::env;

/// Ingest pipeline configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum number of events processed at once (default: 2)
    pub max_concurrency: usize,

    /// Quality passed to the converter for the webp pass (default: 25)
    pub webp_quality: u8,

    /// Thumbnail bounding box width (default: 564)
    pub thumbnail_max_width: u32,

    /// Thumbnail bounding box height (default: 900)
    pub thumbnail_max_height: u32,

    /// Folder whose objects get no thumbnail (default: "quick_content")
    pub quick_content_folder: String,

    /// Image converter binary (default: "convert")
    pub convert_binary: String,

    /// Transcoder type: "magick" or "noop" (default: "magick")
    pub transcoder_type: String,

    /// JPEG quality fraction (0-1) for HEIC normalization (default: 1.0)
    pub heic_jpeg_quality: f32,

    /// Shared secret required on notification requests, if set
    pub webhook_token: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            webp_quality: 25,
            thumbnail_max_width: 564,
            thumbnail_max_height: 900,
            quick_content_folder: "quick_content".to_string(),
            convert_binary: "convert".to_string(),
            transcoder_type: "magick".to_string(),
            heic_jpeg_quality: 1.0,
            webhook_token: None,
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_concurrency: env::var("MAX_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.max_concurrency),

            webp_quality: env::var("WEBP_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.webp_quality),

            thumbnail_max_width: env::var("THUMBNAIL_MAX_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.thumbnail_max_width),

            thumbnail_max_height: env::var("THUMBNAIL_MAX_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.thumbnail_max_height),

            quick_content_folder: env::var("QUICK_CONTENT_FOLDER")
                .unwrap_or(default.quick_content_folder),

            convert_binary: env::var("IMAGEMAGICK_BIN").unwrap_or(default.convert_binary),

            transcoder_type: env::var("TRANSCODER_TYPE").unwrap_or(default.transcoder_type),

            heic_jpeg_quality: env::var("HEIC_JPEG_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|v: f32| v.clamp(0.0, 1.0))
                .unwrap_or(default.heic_jpeg_quality),

            webhook_token: env::var("WEBHOOK_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }

    /// Create config for development (no converter required)
    pub fn development() -> Self {
        Self {
            transcoder_type: "noop".to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.webp_quality, 25);
        assert_eq!(config.thumbnail_max_width, 564);
        assert_eq!(config.thumbnail_max_height, 900);
        assert_eq!(config.quick_content_folder, "quick_content");
        assert_eq!(config.transcoder_type, "magick");
        assert!(config.webhook_token.is_none());
    }

    #[test]
    fn test_development_config() {
        let config = IngestConfig::development();
        assert_eq!(config.transcoder_type, "noop");
        assert_eq!(config.webp_quality, 25);
    }

    #[test]
    fn test_from_env_rejects_zero_concurrency() {
        unsafe { env::set_var("MAX_CONCURRENCY", "0") };
        let config = IngestConfig::from_env();
        unsafe { env::remove_var("MAX_CONCURRENCY") };
        assert_eq!(config.max_concurrency, 2);
    }

    #[test]
    fn test_from_env_clamps_heic_quality() {
        unsafe { env::set_var("HEIC_JPEG_QUALITY", "3.5") };
        let config = IngestConfig::from_env();
        unsafe { env::remove_var("HEIC_JPEG_QUALITY") };
        assert_eq!(config.heic_jpeg_quality, 1.0);
    }
}
