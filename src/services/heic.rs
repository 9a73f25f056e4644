use anyhow::{Context, Result, anyhow};
use image::codecs::jpeg::JpegEncoder;
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

/// Decode a HEIC buffer and re-encode it as JPEG.
///
/// `quality` is a fraction between 0.0 and 1.0, mapped onto the JPEG
/// encoder's 0-100 scale.
pub fn heic_to_jpeg(data: &[u8], quality: f32) -> Result<Vec<u8>> {
    let ctx = HeifContext::read_from_bytes(data).context("failed to parse HEIC container")?;
    let handle = ctx
        .primary_image_handle()
        .context("HEIC container has no primary image")?;

    let lib_heif = LibHeif::new();
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .context("failed to decode HEIC image")?;

    let width = decoded.width();
    let height = decoded.height();

    let planes = decoded.planes();
    let interleaved = planes
        .interleaved
        .ok_or_else(|| anyhow!("decoded HEIC image has no interleaved RGB plane"))?;

    // Decoded rows can carry padding; strip the stride before encoding.
    let row_bytes = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in interleaved.data.chunks(interleaved.stride).take(height as usize) {
        pixels.extend_from_slice(&row[..row_bytes]);
    }

    let jpeg_quality = (quality.clamp(0.0, 1.0) * 100.0).round() as u8;

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, jpeg_quality);
    encoder
        .encode(&pixels, width, height, image::ColorType::Rgb8)
        .context("failed to encode decoded HEIC frame as JPEG")?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_heic_bytes() {
        let result = heic_to_jpeg(b"definitely not a heic file", 1.0);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_buffer() {
        assert!(heic_to_jpeg(&[], 1.0).is_err());
    }
}
