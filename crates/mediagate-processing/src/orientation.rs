//! EXIF orientation handling
//!
//! Cameras record sensor orientation in EXIF tag 274 instead of rotating
//! pixels. Thumbnails are re-encoded without EXIF, so the orientation has to
//! be baked into the pixel data first.

use exif::{In, Reader, Tag};
use image::DynamicImage;

/// Read the EXIF orientation tag (1-8) from raw image bytes.
/// Missing or unreadable EXIF data means the default orientation (1).
pub fn read_orientation(data: &[u8]) -> u32 {
    let mut cursor = std::io::Cursor::new(data);
    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    }
}

/// Apply an EXIF orientation to decoded pixels.
///
/// Orientations 2/4/5/7 are mirrored; 3/6/8 are pure rotations. Values
/// outside 1-8 are treated as the default orientation.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate270().fliph(),
        6 => img.rotate90(),
        7 => img.rotate90().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
