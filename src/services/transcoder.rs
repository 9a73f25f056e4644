use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{error, info};

/// Trait for external image conversion implementations
#[async_trait]
pub trait ImageTranscoder: Send + Sync {
    /// Rewrite the file at `path` in place as a compressed, lossless WebP.
    async fn compress_webp(&self, path: &Path) -> Result<()>;

    /// Shrink the file at `path` in place to fit the configured bounding box.
    /// Images already inside the box are left untouched.
    async fn thumbnail(&self, path: &Path) -> Result<()>;

    /// Check if the converter is available on this host
    async fn health_check(&self) -> bool;
}

pub fn create_transcoder(
    transcoder_type: &str,
    binary: String,
    quality: u8,
    max_width: u32,
    max_height: u32,
) -> Arc<dyn ImageTranscoder> {
    match transcoder_type {
        "noop" => Arc::new(NoopTranscoder),
        _ => Arc::new(MagickTranscoder::new(binary, quality, max_width, max_height)),
    }
}

/// ImageMagick-backed transcoder
///
/// Requires the `convert` binary (or whatever `IMAGEMAGICK_BIN` points at)
/// with WebP delegate support:
/// ```bash
/// convert -list format | grep -i webp
/// ```
pub struct MagickTranscoder {
    binary: String,
    quality: u8,
    max_width: u32,
    max_height: u32,
}

impl MagickTranscoder {
    pub fn new(binary: String, quality: u8, max_width: u32, max_height: u32) -> Self {
        Self {
            binary,
            quality,
            max_width,
            max_height,
        }
    }

    /// Geometry string for the thumbnail pass. The trailing ">" asks the
    /// tool to only ever shrink, never upscale.
    fn bounding_box(&self) -> String {
        format!("{}x{}>", self.max_width, self.max_height)
    }

    async fn run(&self, mut command: Command, action: &str) -> Result<()> {
        let output = command
            .output()
            .await
            .with_context(|| format!("failed to spawn {} for {}", self.binary, action))?;

        if !output.stdout.is_empty() {
            info!(
                "[{}] stdout: {}",
                self.binary,
                String::from_utf8_lossy(&output.stdout).trim()
            );
        }
        if !output.stderr.is_empty() {
            error!(
                "[{}] stderr: {}",
                self.binary,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        if !output.status.success() {
            return Err(anyhow!(
                "{} {} failed with {}",
                self.binary,
                action,
                output.status
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl ImageTranscoder for MagickTranscoder {
    async fn compress_webp(&self, path: &Path) -> Result<()> {
        let mut command = Command::new(&self.binary);
        command
            .arg(path)
            .arg("-quality")
            .arg(self.quality.to_string())
            .arg("-define")
            .arg("webp:lossless=true")
            .arg(path);

        self.run(command, "webp conversion").await
    }

    async fn thumbnail(&self, path: &Path) -> Result<()> {
        let mut command = Command::new(&self.binary);
        command
            .arg(path)
            .arg("-thumbnail")
            .arg(self.bounding_box())
            .arg(path);

        self.run(command, "thumbnail generation").await
    }

    async fn health_check(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

/// Pass-through transcoder for hosts without ImageMagick installed.
/// Files are uploaded as downloaded, only the key derivation still applies.
pub struct NoopTranscoder;

#[async_trait]
impl ImageTranscoder for NoopTranscoder {
    async fn compress_webp(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn thumbnail(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_is_shrink_only() {
        let transcoder = MagickTranscoder::new("convert".to_string(), 25, 564, 900);
        assert_eq!(transcoder.bounding_box(), "564x900>");
    }
}
