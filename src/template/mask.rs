//! Elliptical feature mask defined by a centre handle and a corner handle.

use crate::geom::{IntRect, Point, Rect};

/// Ratio between the corner-handle distance and the ellipse half-axes.
pub const CORNER_FACTOR: f64 = 0.9;

/// Direction used when the corner handle sits on the centre.
const FALLBACK_SIN: f64 = -0.707;
const FALLBACK_COS: f64 = 0.707;

/// Axis-aligned ellipse framing the tracked feature on a key frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EllipseMask {
    frame: Rect,
}

impl EllipseMask {
    /// Builds the ellipse from the user's centre and corner handles.
    ///
    /// The handle distance is raised to `min_radius`, and each half-axis is at
    /// least one pixel, so the mask always covers some pixels.
    pub fn from_handles(center: Point, corner: Point, min_radius: f64) -> Self {
        let (mut sin, mut cos) = (center.sin_to(corner), center.cos_to(corner));
        if sin.is_nan() {
            sin = FALLBACK_SIN;
            cos = FALLBACK_COS;
        }
        let d = center.distance(corner).max(min_radius);
        let dx = at_least_one(d * CORNER_FACTOR * cos);
        let dy = at_least_one(-d * CORNER_FACTOR * sin);
        Self {
            frame: Rect::from_center_corner(center, Point::new(center.x + dx, center.y + dy)),
        }
    }

    /// Bounding frame of the ellipse.
    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn center(&self) -> Point {
        self.frame.center()
    }

    /// Pixel-grid rectangle enclosing the ellipse; templates have this size.
    pub fn bounds(&self) -> IntRect {
        self.frame.bounds()
    }

    /// Whether `p` lies strictly inside the ellipse.
    pub fn contains(&self, p: Point) -> bool {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.frame;
        if width <= 0.0 || height <= 0.0 {
            return false;
        }
        let nx = (p.x - x) / width - 0.5;
        let ny = (p.y - y) / height - 0.5;
        nx * nx + ny * ny < 0.25
    }

    /// Row-major inside flags over `bounds()`.
    ///
    /// A pixel counts as inside only when all four of its corners are inside.
    pub fn pixel_mask(&self) -> Vec<bool> {
        let b = self.bounds();
        let mut out = Vec::with_capacity((b.width * b.height).max(0) as usize);
        for row in 0..b.height {
            for col in 0..b.width {
                let (px, py) = ((b.x + col) as f64, (b.y + row) as f64);
                let inside = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
                    .iter()
                    .all(|(dx, dy)| self.contains(Point::new(px + dx, py + dy)));
                out.push(inside);
            }
        }
        out
    }
}

fn at_least_one(v: f64) -> f64 {
    if v.abs() < 1.0 {
        if v > 0.0 {
            1.0
        } else {
            -1.0
        }
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::EllipseMask;
    use crate::geom::{IntRect, Point};

    #[test]
    fn default_handles_give_expected_bounds() {
        let m = EllipseMask::from_handles(Point::new(30.0, 30.0), Point::new(39.0, 39.0), 4.0);
        let f = m.frame();
        assert!((f.width - 16.2).abs() < 1e-9);
        assert!((f.height - 16.2).abs() < 1e-9);
        assert_eq!(m.bounds(), IntRect::new(21, 21, 18, 18));
    }

    #[test]
    fn coincident_handles_use_fallback_direction() {
        let c = Point::new(10.0, 10.0);
        let m = EllipseMask::from_handles(c, c, 4.0);
        let f = m.frame();
        assert!((f.width - 2.0 * 4.0 * 0.9 * 0.707).abs() < 1e-9);
        assert_eq!(m.center(), c);
    }

    #[test]
    fn pixel_mask_excludes_corners() {
        let m = EllipseMask::from_handles(Point::new(30.0, 30.0), Point::new(39.0, 39.0), 4.0);
        let b = m.bounds();
        let mask = m.pixel_mask();
        assert_eq!(mask.len(), (b.width * b.height) as usize);
        assert!(!mask[0]);
        let mid = (b.height / 2 * b.width + b.width / 2) as usize;
        assert!(mask[mid]);
    }
}
