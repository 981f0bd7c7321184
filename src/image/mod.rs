//! Grayscale frame buffers.
//!
//! `ImageView` borrows a 1D buffer as a 2D image with an explicit stride (the
//! element count between row starts), so padded rows and zero-copy ROIs are
//! both representable. `OwnedImage` is the contiguous owned counterpart used
//! for templates and match snapshots.

use crate::util::{AutoTrackError, AutoTrackResult};

#[cfg(feature = "image-io")]
pub mod io;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> AutoTrackResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> AutoTrackResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(AutoTrackError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns row `y` without its padding.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy view of a sub-rectangle.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> AutoTrackResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(AutoTrackError::InvalidDimensions { width, height });
        }
        let out_of_bounds = AutoTrackError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let fits = x
            .checked_add(width)
            .zip(y.checked_add(height))
            .is_some_and(|(end_x, end_y)| end_x <= self.width && end_y <= self.height);
        if !fits {
            return Err(out_of_bounds);
        }
        let start = y * self.stride + x;
        let data = self.data.get(start..).ok_or(AutoTrackError::BufferTooSmall {
            needed: start.saturating_add(1),
            got: self.data.len(),
        })?;
        ImageView::new(data, width, height, self.stride)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> AutoTrackResult<usize> {
    if width == 0 || height == 0 {
        return Err(AutoTrackError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(AutoTrackError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(AutoTrackError::InvalidDimensions { width, height })
}

/// Owned contiguous 8-bit grayscale image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps a row-major buffer of exactly `width * height` pixels.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> AutoTrackResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() != needed {
            return Err(AutoTrackError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates an image with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> AutoTrackResult<Self> {
        let len = required_len(width, height, width)?;
        Self::new(vec![value; len], width, height)
    }

    /// Creates an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> u8,
    ) -> AutoTrackResult<Self> {
        let len = required_len(width, height, width)?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(data, width, height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.data[y * self.width + x])
    }

    /// Borrowed view over the whole image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}

/// Copies the `width x height` region whose top-left corner is `(x, y)`.
///
/// The origin may lie partly or wholly outside `source`; uncovered pixels are
/// set to `fill`.
pub fn sample_region(
    source: ImageView<'_, u8>,
    x: i64,
    y: i64,
    width: usize,
    height: usize,
    fill: u8,
) -> AutoTrackResult<OwnedImage> {
    let mut out = OwnedImage::filled(width, height, fill)?;
    for row in 0..height {
        let sy = y + row as i64;
        if sy < 0 {
            continue;
        }
        let Some(src_row) = source.row(sy as usize) else {
            break;
        };
        let dst = &mut out.data[row * width..(row + 1) * width];
        for (col, px) in dst.iter_mut().enumerate() {
            let sx = x + col as i64;
            if sx >= 0 {
                if let Some(&v) = src_row.get(sx as usize) {
                    *px = v;
                }
            }
        }
    }
    Ok(out)
}
