use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

use crate::config::IngestConfig;
use crate::services::heic;
use crate::services::storage::StorageService;
use crate::services::transcoder::ImageTranscoder;

/// A finalized-object notification from the store.
#[derive(Debug, Clone)]
pub struct ObjectEvent {
    pub bucket: String,
    /// Object path within the bucket, `/`-separated.
    pub key: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Skipped(SkipReason),
    Processed {
        output_key: String,
        thumbnail_key: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAnImage,
    AlreadyWebp,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotAnImage => "not an image",
            SkipReason::AlreadyWebp => "already in target format",
        }
    }
}

pub struct IngestService {
    storage: Arc<dyn StorageService>,
    transcoder: Arc<dyn ImageTranscoder>,
    config: IngestConfig,
}

impl IngestService {
    pub fn new(
        storage: Arc<dyn StorageService>,
        transcoder: Arc<dyn ImageTranscoder>,
        config: IngestConfig,
    ) -> Self {
        Self {
            storage,
            transcoder,
            config,
        }
    }

    pub async fn transcoder_available(&self) -> bool {
        self.transcoder.health_check().await
    }

    /// Run the full pipeline for one finalized object.
    ///
    /// Download, HEIC normalization when needed, in-place WebP conversion,
    /// upload of the converted file, thumbnail generation and upload (unless
    /// the object sits in the quick-content folder), then deletion of the
    /// source object. Scratch files live in a per-invocation temp directory
    /// that is removed on every exit path.
    pub async fn process(&self, event: &ObjectEvent) -> Result<IngestOutcome> {
        if !event.content_type.starts_with("image/") {
            info!(
                "skipping {}: not an image ({})",
                event.key, event.content_type
            );
            return Ok(IngestOutcome::Skipped(SkipReason::NotAnImage));
        }

        let file_name = base_name(&event.key).to_string();
        if file_name.ends_with(".webp") {
            info!("skipping {}: already in target format", event.key);
            return Ok(IngestOutcome::Skipped(SkipReason::AlreadyWebp));
        }

        let scratch = TempDir::new().context("failed to create scratch directory")?;
        let mut scratch_path = scratch.path().join(&file_name);

        self.storage
            .download_to_path(&event.bucket, &event.key, &scratch_path)
            .await?;
        info!("image downloaded locally to {}", scratch_path.display());

        if is_heic(&file_name) {
            scratch_path = self.normalize_heic(scratch_path).await?;
        }

        self.transcoder.compress_webp(&scratch_path).await?;
        info!("webp created at {}", scratch_path.display());

        // Derived keys always come from the original object key, so a HEIC
        // source still publishes under its own base name.
        let output_key = replace_extension(&event.key, "webp");
        self.storage
            .upload_from_path(
                &event.bucket,
                &output_key,
                &scratch_path,
                Some("image/webp"),
            )
            .await?;
        info!("uploaded converted image to {}", output_key);

        if parent_folder(&event.key) == self.config.quick_content_folder {
            self.storage.delete_object(&event.bucket, &event.key).await?;
            info!("deleted source object {}", event.key);
            return Ok(IngestOutcome::Processed {
                output_key,
                thumbnail_key: None,
            });
        }

        // The thumbnail pass reuses the scratch file the webp pass already
        // rewrote, so it shrinks the converted image, not the original.
        self.transcoder.thumbnail(&scratch_path).await?;

        let thumbnail_key = thumbnail_key(&event.key);
        self.storage
            .upload_from_path(
                &event.bucket,
                &thumbnail_key,
                &scratch_path,
                Some("image/webp"),
            )
            .await?;
        info!("uploaded thumbnail to {}", thumbnail_key);

        self.storage.delete_object(&event.bucket, &event.key).await?;
        info!("deleted source object {}", event.key);

        Ok(IngestOutcome::Processed {
            output_key,
            thumbnail_key: Some(thumbnail_key),
        })
    }

    async fn normalize_heic(&self, path: PathBuf) -> Result<PathBuf> {
        info!("HEIC image begin pre-processing: {}", path.display());

        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read scratch file {}", path.display()))?;

        let quality = self.config.heic_jpeg_quality;
        let jpeg = tokio::task::spawn_blocking(move || heic::heic_to_jpeg(&data, quality))
            .await
            .context("HEIC decode task panicked")??;

        let jpeg_path = path.with_extension("jpeg");
        tokio::fs::write(&jpeg_path, jpeg)
            .await
            .with_context(|| format!("failed to write scratch file {}", jpeg_path.display()))?;

        Ok(jpeg_path)
    }
}

fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// The `.webp` skip above is case-sensitive; HEIC detection is not.
fn is_heic(file_name: &str) -> bool {
    file_name.to_ascii_uppercase().ends_with(".HEIC")
}

fn parent_folder(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[..idx],
        None => "",
    }
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        // A leading dot is a hidden file, not an extension separator.
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

fn join_key(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Same directory, same base name, new extension.
fn replace_extension(key: &str, extension: &str) -> String {
    let dir = parent_folder(key);
    let stem = strip_extension(base_name(key));
    join_key(dir, &format!("{}.{}", stem, extension))
}

/// Same directory, `thumbnail_`-prefixed base name, `.webp` extension.
fn thumbnail_key(key: &str) -> String {
    let dir = parent_folder(key);
    let stem = strip_extension(base_name(key));
    join_key(dir, &format!("thumbnail_{}.webp", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_output_key_next_to_source() {
        assert_eq!(replace_extension("photos/pic.png", "webp"), "photos/pic.webp");
        assert_eq!(replace_extension("pic.jpg", "webp"), "pic.webp");
        assert_eq!(
            replace_extension("a/b/archive.tar.gz", "webp"),
            "a/b/archive.tar.webp"
        );
    }

    #[test]
    fn derives_thumbnail_key_from_original_name() {
        assert_eq!(thumbnail_key("photos/pic.png"), "photos/thumbnail_pic.webp");
        assert_eq!(thumbnail_key("pic.jpg"), "thumbnail_pic.webp");
        // HEIC sources keep their own base name even though the scratch file
        // was rebound to a .jpeg copy.
        assert_eq!(
            thumbnail_key("photos/IMG_0001.HEIC"),
            "photos/thumbnail_IMG_0001.webp"
        );
    }

    #[test]
    fn hidden_files_keep_their_name() {
        assert_eq!(replace_extension(".env", "webp"), ".env.webp");
    }

    #[test]
    fn parent_folder_is_the_full_prefix() {
        assert_eq!(parent_folder("quick_content/pic.jpg"), "quick_content");
        assert_eq!(parent_folder("albums/quick_content/pic.jpg"), "albums/quick_content");
        assert_eq!(parent_folder("pic.jpg"), "");
    }

    #[test]
    fn heic_detection_ignores_case() {
        assert!(is_heic("IMG.HEIC"));
        assert!(is_heic("img.heic"));
        assert!(is_heic("img.HeIc"));
        assert!(!is_heic("img.jpeg"));
        assert!(!is_heic("heic.png"));
    }
}
