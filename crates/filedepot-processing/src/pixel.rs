//! The pixel-transform capability.
//!
//! The transform pipeline never touches codec internals; it talks to a
//! backend through this trait: load a handle, read its dimensions, scale or
//! crop it, save it at a quality setting. `ImageBackend` is the default
//! implementation over the `image` crate.

use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use filedepot_core::{ReceivedUpload, UploadError};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};

/// Opaque image capability consumed by the transform pipeline.
///
/// All operations are synchronous and CPU-bound; callers run them on a
/// blocking thread.
pub trait PixelTransform: Send + Sync + 'static {
    type Handle: Send + 'static;

    fn load(&self, path: &Path) -> anyhow::Result<Self::Handle>;

    /// (width, height) read from the container header, without decoding the
    /// pixel data. Fails when the file is not a supported image.
    fn probe(&self, path: &Path) -> anyhow::Result<(u32, u32)>;

    /// (width, height) of the loaded image.
    fn dimensions(&self, handle: &Self::Handle) -> (u32, u32);

    /// Resize to exactly `width` x `height`.
    fn scale(&self, handle: Self::Handle, width: u32, height: u32) -> Self::Handle;

    /// Cut the `width` x `height` rectangle at `(x, y)`.
    fn crop(&self, handle: Self::Handle, x: u32, y: u32, width: u32, height: u32) -> Self::Handle;

    /// Encode to `path`. `quality` (1-100) applies where the target format
    /// supports it.
    fn save(&self, handle: &Self::Handle, path: &Path, quality: u8) -> anyhow::Result<()>;
}

/// Reject an upload whose bytes are not decodable pixel data, returning the
/// image dimensions otherwise.
///
/// Groups that only hold images apply this after the generic policy checks,
/// so a bad file is refused at ingestion instead of failing on its first
/// transform.
pub fn ensure_image_upload<B: PixelTransform>(
    backend: &B,
    upload: &ReceivedUpload,
) -> Result<(u32, u32), UploadError> {
    backend
        .probe(&upload.temp_path)
        .map_err(|_| UploadError::NotAnImage)
}

/// Default pixel backend over the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageBackend;

impl ImageBackend {
    /// Pick a resampling filter by downscale ratio: cheap filters for heavy
    /// reductions, Lanczos3 near 1:1.
    fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> image::imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }
}

impl PixelTransform for ImageBackend {
    type Handle = DynamicImage;

    fn load(&self, path: &Path) -> anyhow::Result<DynamicImage> {
        image::open(path).with_context(|| format!("failed to load image {}", path.display()))
    }

    fn probe(&self, path: &Path) -> anyhow::Result<(u32, u32)> {
        // Sniff the format from the bytes, not the extension.
        image::ImageReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("failed to read {}", path.display()))?
            .into_dimensions()
            .with_context(|| format!("not a readable image: {}", path.display()))
    }

    fn dimensions(&self, handle: &DynamicImage) -> (u32, u32) {
        handle.dimensions()
    }

    fn scale(&self, handle: DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = handle.dimensions();
        if (orig_width, orig_height) == (width, height) {
            return handle;
        }
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        handle.resize_exact(width, height, filter)
    }

    fn crop(&self, handle: DynamicImage, x: u32, y: u32, width: u32, height: u32) -> DynamicImage {
        handle.crop_imm(x, y, width, height)
    }

    fn save(&self, handle: &DynamicImage, path: &Path, quality: u8) -> anyhow::Result<()> {
        let format = ImageFormat::from_path(path)
            .with_context(|| format!("no image format for {}", path.display()))?;

        match format {
            ImageFormat::Jpeg => {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                let writer = BufWriter::new(file);
                let encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
                // JPEG has no alpha channel.
                DynamicImage::ImageRgb8(handle.to_rgb8())
                    .write_with_encoder(encoder)
                    .with_context(|| format!("failed to encode jpeg {}", path.display()))?;
            }
            _ => {
                handle
                    .save(path)
                    .with_context(|| format!("failed to save {}", path.display()))?;
            }
        }

        Ok(())
    }
}
