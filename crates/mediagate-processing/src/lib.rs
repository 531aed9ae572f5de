//! Mediagate Processing Library
//!
//! Thumbnail derivation: EXIF orientation normalization, bounded resize
//! without upscaling, JPEG re-encode.

pub mod orientation;
pub mod thumbnail;

pub use thumbnail::{Thumbnailer, ThumbnailError};
