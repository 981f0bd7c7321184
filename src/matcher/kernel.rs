//! Masked sum-of-squared-differences kernels.
//!
//! Placements are given as the template's top-left corner in window
//! coordinates. A placement that does not fit in the window scores NaN.

use crate::image::ImageView;
use crate::template::Template;

/// Masked SSD between `template` and `window` at placement `(x, y)`.
pub(crate) fn masked_ssd_at(window: ImageView<'_, u8>, template: &Template, x: i64, y: i64) -> f64 {
    let (tw, th) = (template.width(), template.height());
    if x < 0 || y < 0 {
        return f64::NAN;
    }
    let (x, y) = (x as usize, y as usize);
    if x + tw > window.width() || y + th > window.height() {
        return f64::NAN;
    }
    let tpl = template.image().data();
    let mask = template.mask();
    let mut sum = 0.0f64;
    for ty in 0..th {
        let Some(row) = window.row(y + ty) else {
            return f64::NAN;
        };
        let row = &row[x..x + tw];
        let base = ty * tw;
        for (tx, &value) in row.iter().enumerate() {
            if mask[base + tx] {
                let d = tpl[base + tx] as f64 - value as f64;
                sum += d * d;
            }
        }
    }
    sum
}

/// SSD for every placement in `0..cols x 0..rows`, row-major.
pub(crate) fn ssd_grid(
    window: ImageView<'_, u8>,
    template: &Template,
    cols: usize,
    rows: usize,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(cols * rows);
    for y in 0..rows {
        for x in 0..cols {
            out.push(masked_ssd_at(window, template, x as i64, y as i64));
        }
    }
    out
}

/// Row-parallel variant of [`ssd_grid`].
#[cfg(feature = "rayon")]
pub(crate) fn ssd_grid_par(
    window: ImageView<'_, u8>,
    template: &Template,
    cols: usize,
    rows: usize,
) -> Vec<f64> {
    use rayon::prelude::*;

    (0..rows)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..cols).map(move |x| masked_ssd_at(window, template, x as i64, y as i64))
        })
        .collect()
}
