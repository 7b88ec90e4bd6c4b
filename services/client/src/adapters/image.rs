//! services/client/src/adapters/image.rs
//!
//! This module contains the image normalization adapter.
//! It implements the `ImageNormalizer` port from the `core` crate: whatever
//! the user picked, the wire sees one canonical form (JPEG, at most
//! 1080 px wide, fixed compression quality).

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use nutripet_core::domain::{EncodedImage, ImageSource};
use nutripet_core::ports::{ImageNormalizer, PortError, PortResult};
use std::io::ErrorKind;

/// Uploads never exceed this width; larger images are scaled down
/// proportionally.
const MAX_WIDTH: u32 = 1080;
/// JPEG compression quality for the upload.
const JPEG_QUALITY: u8 = 70;
/// The backend only cares about the field name, but give it a stable filename.
const UPLOAD_FILE_NAME: &str = "food.jpg";

/// An adapter that implements the `ImageNormalizer` port with the `image`
/// crate.
#[derive(Clone)]
pub struct JpegNormalizer;

impl JpegNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn encode(bytes: &[u8]) -> PortResult<Vec<u8>> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|err| PortError::Unexpected(format!("could not decode image: {err}")))?;

        let resized = if decoded.width() > MAX_WIDTH {
            let height = (u64::from(decoded.height()) * u64::from(MAX_WIDTH)
                / u64::from(decoded.width())) as u32;
            decoded.resize_exact(MAX_WIDTH, height.max(1), FilterType::Triangle)
        } else {
            decoded
        };

        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        rgb.write_with_encoder(encoder)
            .map_err(|err| PortError::Unexpected(format!("could not encode JPEG: {err}")))?;
        Ok(out)
    }
}

impl Default for JpegNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageNormalizer for JpegNormalizer {
    /// Reads the picked image from disk and re-encodes it into the canonical
    /// upload form.
    async fn normalize(&self, source: &ImageSource) -> PortResult<EncodedImage> {
        let path = source
            .uri
            .strip_prefix("file://")
            .unwrap_or(&source.uri)
            .to_string();

        let bytes = tokio::fs::read(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::PermissionDenied {
                PortError::PermissionDenied(format!("cannot read {path}: {err}"))
            } else {
                PortError::Unexpected(format!("cannot read {path}: {err}"))
            }
        })?;

        // Decode/resize/encode is CPU work; keep it off the async threads.
        let encoded = tokio::task::spawn_blocking(move || Self::encode(&bytes))
            .await
            .map_err(|err| PortError::Unexpected(err.to_string()))??;

        Ok(EncodedImage {
            bytes: encoded,
            mime_type: "image/jpeg".to_string(),
            file_name: UPLOAD_FILE_NAME.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    async fn write_png(width: u32, height: u32) -> (tempfile::TempDir, String) {
        let img = RgbImage::from_pixel(width, height, image::Rgb([120, 200, 80]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meal.png");
        tokio::fs::write(&path, buf).await.unwrap();
        let uri = format!("file://{}", path.display());
        (dir, uri)
    }

    #[tokio::test]
    async fn oversized_images_are_bounded_to_the_max_width() {
        let (_dir, uri) = write_png(2160, 1200).await;
        let source = ImageSource {
            uri,
            mime_type: "image/png".to_string(),
        };

        let encoded = JpegNormalizer::new().normalize(&source).await.unwrap();
        assert_eq!(encoded.mime_type, "image/jpeg");
        assert_eq!(encoded.file_name, "food.jpg");

        let reloaded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(reloaded.width(), 1080);
        assert_eq!(reloaded.height(), 600);
    }

    #[tokio::test]
    async fn small_images_keep_their_dimensions() {
        let (_dir, uri) = write_png(640, 480).await;
        let source = ImageSource {
            uri,
            mime_type: "image/png".to_string(),
        };

        let encoded = JpegNormalizer::new().normalize(&source).await.unwrap();
        let reloaded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(reloaded.width(), 640);
        assert_eq!(reloaded.height(), 480);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = ImageSource {
            uri: "file:///definitely/not/here.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
        };
        assert!(JpegNormalizer::new().normalize(&source).await.is_err());
    }
}
