//! Match templates and the key-frame mask that shapes them.

use crate::image::{ImageView, OwnedImage};
use crate::util::{AutoTrackError, AutoTrackResult};

pub mod manager;
pub mod mask;

pub use manager::TemplateManager;
pub use mask::{EllipseMask, CORNER_FACTOR};

/// Grayscale template with a per-pixel opacity mask.
///
/// Only opaque pixels take part in matching.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    image: OwnedImage,
    mask: Vec<bool>,
}

impl Template {
    /// Pairs an image with its opacity mask (row-major, same size).
    pub fn new(image: OwnedImage, mask: Vec<bool>) -> AutoTrackResult<Self> {
        let needed = image.width() * image.height();
        if mask.len() != needed {
            return Err(AutoTrackError::MaskMismatch {
                needed,
                got: mask.len(),
            });
        }
        Ok(Self { image, mask })
    }

    /// Template in which every pixel is opaque.
    pub fn opaque(image: OwnedImage) -> Self {
        let mask = vec![true; image.width() * image.height()];
        Self { image, mask }
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }

    pub fn image(&self) -> &OwnedImage {
        &self.image
    }

    pub fn view(&self) -> ImageView<'_, u8> {
        self.image.view()
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn is_opaque(&self, x: usize, y: usize) -> bool {
        x < self.width() && y < self.height() && self.mask[y * self.width() + x]
    }

    /// Number of pixels that take part in matching.
    pub fn opaque_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}
