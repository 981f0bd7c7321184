//! Peak-fitting helpers for sub-pixel match refinement.

/// Vertex offset of the parabola through three samples.
///
/// `xs` holds the sample abscissae with the centre sample at `xs[1] == 0`.
/// Returns `None` when the parabola is not concave, is ill-conditioned, or
/// its vertex falls outside the sampled span.
pub(crate) fn quad_peak_offset(xs: [f64; 3], ys: [f64; 3]) -> Option<(f64, f64)> {
    if ys.iter().chain(xs.iter()).any(|v| !v.is_finite()) {
        return None;
    }
    let [x0, x1, x2] = xs;
    let [y0, y1, y2] = ys;
    let denom = (x0 - x1) * (x0 - x2) * (x1 - x2);
    if denom.abs() < 1e-12 {
        return None;
    }
    let c = (x2 * (y1 - y0) + x1 * (y0 - y2) + x0 * (y2 - y1)) / denom;
    let b = (x2 * x2 * (y0 - y1) + x1 * x1 * (y2 - y0) + x0 * x0 * (y1 - y2)) / denom;
    if c > -1e-12 {
        return None;
    }
    let offset = -b / (2.0 * c);
    if offset.is_finite() && offset >= x0.min(x2) && offset <= x0.max(x2) {
        Some((offset, c))
    } else {
        None
    }
}

/// Fits `a * exp(-(x - b)^2 / w)` through three positive peak heights.
///
/// The fit is exact: the logarithm of a Gaussian is a parabola. Returns the
/// peak offset `b` and width `w`.
pub(crate) fn gaussian_peak(xs: [f64; 3], heights: [f64; 3]) -> Option<(f64, f64)> {
    if heights.iter().any(|h| !(*h > 0.0)) {
        return None;
    }
    let logs = heights.map(f64::ln);
    let (offset, curvature) = quad_peak_offset(xs, logs)?;
    Some((offset, -1.0 / curvature))
}

#[cfg(test)]
mod tests {
    use super::{gaussian_peak, quad_peak_offset};

    const UNIT: [f64; 3] = [-1.0, 0.0, 1.0];

    #[test]
    fn quad_peak_offset_symmetric() {
        let (dx, _) = quad_peak_offset(UNIT, [0.9, 1.0, 0.9]).unwrap();
        assert!(dx.abs() < 1e-9);
    }

    #[test]
    fn quad_peak_offset_shifted() {
        let f = |x: f64| 1.0 - (x - 0.25).powi(2);
        let (dx, _) = quad_peak_offset(UNIT, [f(-1.0), f(0.0), f(1.0)]).unwrap();
        assert!((dx - 0.25).abs() < 1e-9);
    }

    #[test]
    fn quad_peak_offset_uneven_spacing() {
        let f = |x: f64| 4.0 - (x + 0.3).powi(2);
        let xs = [-1.4, 0.0, 0.7];
        let (dx, _) = quad_peak_offset(xs, xs.map(f)).unwrap();
        assert!((dx + 0.3).abs() < 1e-9);
    }

    #[test]
    fn quad_peak_offset_non_concave() {
        assert!(quad_peak_offset(UNIT, [1.0, 0.5, 1.0]).is_none());
    }

    #[test]
    fn gaussian_peak_recovers_offset_and_width() {
        let g = |x: f64| 7.0 * (-(x - 0.2).powi(2) / 1.5).exp();
        let (b, w) = gaussian_peak(UNIT, UNIT.map(g)).unwrap();
        assert!((b - 0.2).abs() < 1e-9);
        assert!((w - 1.5).abs() < 1e-9);
    }

    #[test]
    fn gaussian_peak_rejects_non_positive_heights() {
        assert!(gaussian_peak(UNIT, [0.0, 2.0, 1.0]).is_none());
        assert!(gaussian_peak(UNIT, [1.0, f64::INFINITY, 1.0]).is_none());
    }
}
