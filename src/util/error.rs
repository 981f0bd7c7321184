//! Error types for autotrack.

use thiserror::Error;

/// Result alias for autotrack operations.
pub type AutoTrackResult<T> = std::result::Result<T, AutoTrackError>;

/// Errors raised while building images, templates or tracker configuration.
///
/// The tracking engine itself never fails: a missing match or an impossible
/// search is reported through `Option`/`bool` returns and status codes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AutoTrackError {
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("stride {stride} is smaller than width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer cannot hold the declared image.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Region of interest extends outside the image.
    #[error("roi ({x}, {y}, {width}x{height}) is outside image {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Mask length does not match the template size.
    #[error("mask has {got} entries, template needs {needed}")]
    MaskMismatch { needed: usize, got: usize },
    /// Tracker options violate their documented ranges.
    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),
    /// Image decoding or file access failed.
    #[error("image i/o failed: {reason}")]
    ImageIo { reason: String },
}
