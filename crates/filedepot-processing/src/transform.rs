//! Named image transforms over the derived-artifact cache.
//!
//! Four operations: `heighten` and `widen` scale one dimension and let the
//! other follow proportionally, `contain` fits inside a box without
//! cropping, `cover` fills a box and crops at an anchor point. Every
//! operation renders from the original source file, so consecutive
//! operations never compound, and serves repeat calls from the cache.
//!
//! Each operation's cache-key parameter order is fixed and documented on the
//! method; changing an order would silently orphan every previously cached
//! artifact of that operation.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use filedepot_core::StoredFile;
use filedepot_storage::{CacheKey, CachedArtifact, DerivedCache, StorageError};
use thiserror::Error;

use crate::pixel::{ImageBackend, PixelTransform};

/// Transform errors
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("invalid transform parameters: {0}")]
    InvalidParams(String),
}

/// 9-point crop anchor for `cover`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Anchor {
    /// Canonical string form, used verbatim in cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Anchor::TopLeft => "top-left",
            Anchor::Top => "top",
            Anchor::TopRight => "top-right",
            Anchor::Left => "left",
            Anchor::Center => "center",
            Anchor::Right => "right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::Bottom => "bottom",
            Anchor::BottomRight => "bottom-right",
        }
    }

    /// Crop offset for the given overflow beyond the target box.
    fn offsets(self, overflow_x: u32, overflow_y: u32) -> (u32, u32) {
        let x = match self {
            Anchor::TopLeft | Anchor::Left | Anchor::BottomLeft => 0,
            Anchor::Top | Anchor::Center | Anchor::Bottom => overflow_x / 2,
            Anchor::TopRight | Anchor::Right | Anchor::BottomRight => overflow_x,
        };
        let y = match self {
            Anchor::TopLeft | Anchor::Top | Anchor::TopRight => 0,
            Anchor::Left | Anchor::Center | Anchor::Right => overflow_y / 2,
            Anchor::BottomLeft | Anchor::Bottom | Anchor::BottomRight => overflow_y,
        };
        (x, y)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top-left" => Ok(Anchor::TopLeft),
            "top" => Ok(Anchor::Top),
            "top-right" => Ok(Anchor::TopRight),
            "left" => Ok(Anchor::Left),
            "center" => Ok(Anchor::Center),
            "right" => Ok(Anchor::Right),
            "bottom-left" => Ok(Anchor::BottomLeft),
            "bottom" => Ok(Anchor::Bottom),
            "bottom-right" => Ok(Anchor::BottomRight),
            _ => Err(format!("unknown anchor {:?}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FitOp {
    Heighten { height: u32 },
    Widen { width: u32 },
    Contain { width: u32, height: u32 },
    Cover { width: u32, height: u32, anchor: Anchor },
}

/// Transform pipeline: named operations wired into the derived-artifact
/// cache with a pixel backend as producer.
pub struct Transformer<B: PixelTransform = ImageBackend> {
    cache: Arc<DerivedCache>,
    backend: B,
}

impl Transformer<ImageBackend> {
    /// Transformer with the default `image`-crate backend.
    pub fn with_default_backend(cache: Arc<DerivedCache>) -> Self {
        Transformer::new(cache, ImageBackend)
    }
}

impl<B: PixelTransform + Clone> Transformer<B> {
    pub fn new(cache: Arc<DerivedCache>, backend: B) -> Self {
        Transformer { cache, backend }
    }

    pub fn cache(&self) -> &Arc<DerivedCache> {
        &self.cache
    }

    /// Scale to `height`, width following proportionally.
    ///
    /// Key parameter order: `height`, `quality`, `upsize`.
    pub async fn heighten(
        &self,
        file: &StoredFile,
        height: u32,
        quality: u8,
        upsize: bool,
    ) -> Result<CachedArtifact, TransformError> {
        ensure_dim("height", height)?;
        let key = CacheKey::new(
            "heighten",
            vec![height.into(), quality.into(), upsize.into()],
            &file.sys_name,
        );
        self.run(file, key, FitOp::Heighten { height }, quality, upsize)
            .await
    }

    /// Scale to `width`, height following proportionally.
    ///
    /// Key parameter order: `width`, `quality`, `upsize`.
    pub async fn widen(
        &self,
        file: &StoredFile,
        width: u32,
        quality: u8,
        upsize: bool,
    ) -> Result<CachedArtifact, TransformError> {
        ensure_dim("width", width)?;
        let key = CacheKey::new(
            "widen",
            vec![width.into(), quality.into(), upsize.into()],
            &file.sys_name,
        );
        self.run(file, key, FitOp::Widen { width }, quality, upsize)
            .await
    }

    /// Fit inside `width` x `height` preserving aspect ratio, no cropping.
    ///
    /// Key parameter order: `width`, `height`, `quality`, `upsize`.
    pub async fn contain(
        &self,
        file: &StoredFile,
        width: u32,
        height: u32,
        quality: u8,
        upsize: bool,
    ) -> Result<CachedArtifact, TransformError> {
        ensure_dim("width", width)?;
        ensure_dim("height", height)?;
        let key = CacheKey::new(
            "contain",
            vec![width.into(), height.into(), quality.into(), upsize.into()],
            &file.sys_name,
        );
        self.run(file, key, FitOp::Contain { width, height }, quality, upsize)
            .await
    }

    /// Fill `width` x `height`, cropping the overflow at `anchor`.
    ///
    /// Key parameter order: `width`, `height`, `anchor`, `quality`, `upsize`.
    pub async fn cover(
        &self,
        file: &StoredFile,
        width: u32,
        height: u32,
        anchor: Anchor,
        quality: u8,
        upsize: bool,
    ) -> Result<CachedArtifact, TransformError> {
        ensure_dim("width", width)?;
        ensure_dim("height", height)?;
        let key = CacheKey::new(
            "cover",
            vec![
                width.into(),
                height.into(),
                anchor.as_str().into(),
                quality.into(),
                upsize.into(),
            ],
            &file.sys_name,
        );
        self.run(
            file,
            key,
            FitOp::Cover {
                width,
                height,
                anchor,
            },
            quality,
            upsize,
        )
        .await
    }

    async fn run(
        &self,
        file: &StoredFile,
        key: CacheKey,
        op: FitOp,
        quality: u8,
        upsize: bool,
    ) -> Result<CachedArtifact, TransformError> {
        if !file.is_persisted() {
            return Err(StorageError::NoFileBound(file.name()).into());
        }
        let bucket = file.bucket().map_err(StorageError::from)?;
        let source = self.cache.layout().file_path(&bucket, &file.sys_name);

        let backend = self.backend.clone();
        let artifact = self
            .cache
            .get_or_generate(&bucket, &key, move |tmp| async move {
                tokio::task::spawn_blocking(move || {
                    render(&backend, &source, &tmp, op, quality, upsize)
                })
                .await
                .map_err(|e| anyhow::anyhow!("pixel transform task failed: {}", e))?
            })
            .await?;

        tracing::debug!(
            artifact = %artifact.path.display(),
            source = %file.sys_name,
            "transform served"
        );

        Ok(artifact)
    }
}

fn ensure_dim(name: &str, value: u32) -> Result<(), TransformError> {
    if value == 0 {
        return Err(TransformError::InvalidParams(format!(
            "{} must be greater than zero",
            name
        )));
    }
    Ok(())
}

fn render<B: PixelTransform>(
    backend: &B,
    source: &Path,
    dest: &Path,
    op: FitOp,
    quality: u8,
    upsize: bool,
) -> anyhow::Result<()> {
    let img = backend.load(source)?;
    let (orig_w, orig_h) = backend.dimensions(&img);
    anyhow::ensure!(orig_w > 0 && orig_h > 0, "source image has zero dimensions");

    let out = match op {
        FitOp::Heighten { height } => {
            let target_h = if upsize { height } else { height.min(orig_h) };
            let target_w = proportional(orig_w, target_h, orig_h);
            backend.scale(img, target_w, target_h)
        }
        FitOp::Widen { width } => {
            let target_w = if upsize { width } else { width.min(orig_w) };
            let target_h = proportional(orig_h, target_w, orig_w);
            backend.scale(img, target_w, target_h)
        }
        FitOp::Contain { width, height } => {
            let mut scale =
                (width as f64 / orig_w as f64).min(height as f64 / orig_h as f64);
            if !upsize {
                scale = scale.min(1.0);
            }
            backend.scale(img, scaled(orig_w, scale), scaled(orig_h, scale))
        }
        FitOp::Cover {
            width,
            height,
            anchor,
        } => {
            let mut scale =
                (width as f64 / orig_w as f64).max(height as f64 / orig_h as f64);
            if !upsize {
                scale = scale.min(1.0);
            }
            let (scaled_w, scaled_h) = (scaled(orig_w, scale), scaled(orig_h, scale));
            let img = backend.scale(img, scaled_w, scaled_h);

            let crop_w = width.min(scaled_w);
            let crop_h = height.min(scaled_h);
            let (x, y) = anchor.offsets(scaled_w - crop_w, scaled_h - crop_h);
            backend.crop(img, x, y, crop_w, crop_h)
        }
    };

    backend.save(&out, dest, quality)
}

/// `value * target / basis`, rounded, at least 1.
fn proportional(value: u32, target: u32, basis: u32) -> u32 {
    let scaled = (value as u64 * target as u64 + basis as u64 / 2) / basis as u64;
    scaled.max(1) as u32
}

fn scaled(value: u32, scale: f64) -> u32 {
    ((value as f64 * scale).round() as u32).max(1)
}
