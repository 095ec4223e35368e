use crate::models::{Attachment, MediaKind, DEFAULT_IMAGE_MAX_DIMENSION};
use crate::{Error, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Turns user-selected files into request attachments.
#[derive(Debug, Clone)]
pub struct MediaProcessor {
    max_dimension: u32,
}

impl MediaProcessor {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn downscale_sync(image: DynamicImage, max_dimension: u32) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        let image = if width.max(height) > max_dimension {
            // `resize` keeps the aspect ratio and fits within the bounds.
            image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
        } else {
            image
        };

        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut bytes = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
        Ok(bytes)
    }

    /// Decode an image, fit its longest edge within `max_dimension`, and
    /// re-encode it as JPEG.
    pub async fn downscale_image(&self, image_data: &[u8]) -> Result<Vec<u8>> {
        let image = image::load_from_memory(image_data)?;
        let max_dimension = self.max_dimension;

        tokio::task::spawn_blocking(move || Self::downscale_sync(image, max_dimension))
            .await
            .map_err(|e| Error::Invariant(format!("Image processing task join error: {}", e)))?
    }

    /// Read a file and wrap it as an attachment; images are downscaled.
    pub async fn load_attachment(&self, path: &Path, kind: MediaKind) -> Result<Attachment> {
        let data = tokio::fs::read(path).await?;
        tracing::debug!("Read {} bytes from {}", data.len(), path.display());

        match kind {
            MediaKind::Image => {
                let resized = self.downscale_image(&data).await?;
                tracing::info!(
                    "Prepared image {} ({} -> {} bytes)",
                    path.display(),
                    data.len(),
                    resized.len()
                );
                Ok(Attachment::new(MediaKind::Image, "image/jpeg", resized))
            }
            MediaKind::Audio => Ok(Attachment::audio(data)),
        }
    }
}

impl Default for MediaProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_MAX_DIMENSION)
    }
}
