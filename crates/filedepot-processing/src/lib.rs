//! Filedepot Processing Library
//!
//! Size/shape transforms for stored images, served through the
//! derived-artifact cache: the first call with a given parameter set renders
//! and caches the artifact, later calls are pure cache reads.
//!
//! Pixel work is delegated to an opaque backend behind the `PixelTransform`
//! trait; the default backend uses the `image` crate.

pub mod pixel;
pub mod transform;

// Re-export commonly used types
pub use pixel::{ensure_image_upload, ImageBackend, PixelTransform};
pub use transform::{Anchor, TransformError, Transformer};
