//! Frame loading through the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::OwnedImage;
use crate::util::{AutoTrackError, AutoTrackResult};
use std::path::Path;

/// Converts any decoded image to an owned luma frame.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> AutoTrackResult<OwnedImage> {
    let gray = img.to_luma8();
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    OwnedImage::new(gray.into_raw(), width, height)
}

/// Loads one frame from disk as grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> AutoTrackResult<OwnedImage> {
    let img = image::open(path.as_ref()).map_err(|err| AutoTrackError::ImageIo {
        reason: format!("{}: {err}", path.as_ref().display()),
    })?;
    owned_from_dynamic_image(&img)
}

/// Loads an ordered list of frames, failing on the first unreadable file.
pub fn load_frames<P: AsRef<Path>>(paths: &[P]) -> AutoTrackResult<Vec<OwnedImage>> {
    paths.iter().map(load_gray_image).collect()
}
