use crate::orientation;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageReader;
use std::io::Cursor;
use thiserror::Error;

const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode thumbnail: {0}")]
    Encode(String),
}

/// Derives JPEG thumbnails bounded by a maximum edge length.
///
/// Orientation is normalized from EXIF before resizing. Images already
/// within bounds are re-encoded without resizing; thumbnails never upscale.
#[derive(Debug, Clone)]
pub struct Thumbnailer {
    max_edge: u32,
    quality: u8,
}

impl Thumbnailer {
    pub fn new(max_edge: u32) -> Self {
        Self {
            max_edge,
            quality: JPEG_QUALITY,
        }
    }

    /// Render a JPEG thumbnail from raw source image bytes.
    pub fn render(&self, data: &[u8]) -> Result<Vec<u8>, ThumbnailError> {
        let start = std::time::Instant::now();

        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ThumbnailError::Decode(e.to_string()))?;
        let img = reader
            .decode()
            .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

        let img = orientation::apply_orientation(img, orientation::read_orientation(data));

        let (width, height) = (img.width(), img.height());
        let img = if width > self.max_edge || height > self.max_edge {
            img.resize(self.max_edge, self.max_edge, FilterType::Lanczos3)
        } else {
            img
        };

        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
        encoder
            .encode_image(&img.to_rgb8())
            .map_err(|e| ThumbnailError::Encode(e.to_string()))?;

        tracing::debug!(
            source_width = width,
            source_height = height,
            thumb_width = img.width(),
            thumb_height = img.height(),
            size_bytes = out.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Thumbnail rendered"
        );

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 80, 40]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn decoded_dimensions(jpeg: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(jpeg).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn large_image_bounded_by_max_edge() {
        let thumb = Thumbnailer::new(64).render(&png_bytes(200, 100)).unwrap();
        let (w, h) = decoded_dimensions(&thumb);
        assert_eq!((w, h), (64, 32));
    }

    #[test]
    fn portrait_image_bounded_on_height() {
        let thumb = Thumbnailer::new(64).render(&png_bytes(100, 200)).unwrap();
        let (w, h) = decoded_dimensions(&thumb);
        assert_eq!((w, h), (32, 64));
    }

    #[test]
    fn small_image_never_upscaled() {
        let thumb = Thumbnailer::new(640).render(&png_bytes(20, 10)).unwrap();
        let (w, h) = decoded_dimensions(&thumb);
        assert_eq!((w, h), (20, 10));
    }

    #[test]
    fn output_is_jpeg() {
        let thumb = Thumbnailer::new(64).render(&png_bytes(100, 100)).unwrap();
        assert_eq!(image::guess_format(&thumb).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn invalid_data_is_decode_error() {
        let result = Thumbnailer::new(64).render(b"definitely not an image");
        assert!(matches!(result, Err(ThumbnailError::Decode(_))));
    }
}
