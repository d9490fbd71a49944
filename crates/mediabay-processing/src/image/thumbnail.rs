use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GenericImageView, ImageReader};
use mediabay_core::ScaleBasis;
use mediabay_storage::layout;
use uuid::Uuid;

use super::orientation::ImageOrientation;
use super::resize::ImageResize;
use crate::traits::Resizer;

const THUMBNAIL_JPEG_QUALITY: u8 = 80;

/// An encoded thumbnail, not yet written anywhere
#[derive(Debug, Clone)]
pub struct RenderedThumbnail {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decodes a still, scales it with nearest-neighbour sampling and encodes
/// an upright JPEG.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailEngine {
    scale_basis: ScaleBasis,
    quality: u8,
}

impl Default for ThumbnailEngine {
    fn default() -> Self {
        Self::new(ScaleBasis::Width)
    }
}

impl ThumbnailEngine {
    pub fn new(scale_basis: ScaleBasis) -> Self {
        Self {
            scale_basis,
            quality: THUMBNAIL_JPEG_QUALITY,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Canonical location of the `width` thumbnail for `asset_id` in `dir`.
    pub fn thumbnail_path(dir: &Path, asset_id: Uuid, width: u32) -> PathBuf {
        dir.join(layout::thumbnail_file_name(asset_id, width))
    }

    /// Scale encoded image `data` to `target_width` and encode it as JPEG.
    ///
    /// Dimensions are computed on the displayed image: for EXIF orientations
    /// that involve a quarter turn the stored width and height are swapped
    /// before scaling. The orientation is then baked into the output pixels.
    pub fn render(&self, data: &[u8], target_width: u32) -> Result<RenderedThumbnail> {
        if target_width == 0 {
            bail!("Thumbnail width must be greater than 0");
        }

        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .context("Failed to detect image format")?
            .decode()
            .context("Failed to decode image")?;

        let orientation = ImageOrientation::read_exif_orientation(data);
        let swapped = ImageOrientation::swaps_axes(orientation);

        let (stored_w, stored_h) = img.dimensions();
        let (display_w, display_h) = if swapped {
            (stored_h, stored_w)
        } else {
            (stored_w, stored_h)
        };

        let (out_w, out_h) =
            ImageResize::scaled_dimensions(display_w, display_h, target_width, self.scale_basis);
        let (resize_w, resize_h) = if swapped { (out_h, out_w) } else { (out_w, out_h) };

        let resized = img.resize_exact(resize_w, resize_h, FilterType::Nearest);
        let upright = ImageOrientation::apply(resized, orientation);
        let rgb = upright.to_rgb8();

        let mut encoded = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut encoded, self.quality);
            encoder
                .encode_image(&rgb)
                .context("Failed to encode thumbnail as JPEG")?;
        }

        Ok(RenderedThumbnail {
            data: encoded,
            width: rgb.width(),
            height: rgb.height(),
        })
    }

    /// Read `source`, render a `target_width` thumbnail and write it next to
    /// `dest` with a `.jpg` extension. A failed write leaves no file behind.
    pub fn generate(&self, source: &Path, target_width: u32, dest: &Path) -> Result<PathBuf> {
        let start = std::time::Instant::now();

        let data = std::fs::read(source)
            .with_context(|| format!("Failed to read {}", source.display()))?;
        let rendered = self.render(&data, target_width)?;

        let out = jpeg_destination(dest);
        if let Err(e) = std::fs::write(&out, &rendered.data) {
            let _ = std::fs::remove_file(&out);
            return Err(e).with_context(|| format!("Failed to write {}", out.display()));
        }

        tracing::info!(
            source = %source.display(),
            path = %out.display(),
            width = rendered.width,
            height = rendered.height,
            size_bytes = rendered.data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Thumbnail generated"
        );

        Ok(out)
    }
}

#[async_trait]
impl Resizer for ThumbnailEngine {
    async fn resize(&self, source: &Path, target_width: u32, dest: &Path) -> Result<PathBuf> {
        let engine = *self;
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || engine.generate(&source, target_width, &dest))
            .await
            .context("Thumbnail task panicked")?
    }
}

/// `dest` with its extension forced to `jpg`, unless it already is a JPEG
/// extension.
pub fn jpeg_destination(dest: &Path) -> PathBuf {
    let is_jpeg = dest
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false);

    if is_jpeg {
        dest.to_path_buf()
    } else {
        dest.with_extension(layout::IMAGE_EXTENSION)
    }
}
