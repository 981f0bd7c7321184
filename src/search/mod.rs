//! Search-rectangle placement and clamping.
//!
//! The search rectangle is described by a centre and a corner handle. After
//! every move it is clamped into the frame: first shrunk (never grown) so it
//! fits, then translated so it lies inside `[0, width] x [0, height]`.

use crate::geom::{IntRect, Point, Rect};
use crate::store::SearchPoints;

/// Clamps `rect` into a `width x height` image. Returns whether it changed.
///
/// Width and height are capped independently, so an oversized rectangle is
/// not scaled uniformly. Applying the clamp twice equals applying it once.
pub fn clamp_rect_into_image(rect: &mut Rect, width: usize, height: usize) -> bool {
    let (w, h) = (width as f64, height as f64);
    let (x0, y0) = (rect.x, rect.y);
    let mut changed = false;

    if w < rect.width || h < rect.height {
        changed = true;
        *rect = Rect::new(x0, y0, rect.width.trunc().min(w), rect.height.trunc().min(h));
    }

    // Translation uses the kept size, fractional widths included.
    let x = x0.max(0.0).min(w - rect.width);
    let y = y0.max(0.0).min(h - rect.height);
    if x != x0 || y != y0 {
        changed = true;
        *rect = Rect::new(x, y, rect.width, rect.height);
    }
    changed
}

/// The active search rectangle and its handles.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SearchRegion {
    center: Point,
    corner: Point,
    rect: Rect,
}

impl SearchRegion {
    /// Region from handles, not yet clamped.
    pub fn new(center: Point, corner: Point) -> Self {
        Self {
            center,
            corner,
            rect: Rect::from_center_corner(center, corner),
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn corner(&self) -> Point {
        self.corner
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Pixel rectangle handed to the matcher.
    pub fn bounds(&self) -> IntRect {
        self.rect.bounds()
    }

    pub fn points(&self) -> SearchPoints {
        SearchPoints {
            center: self.center,
            corner: self.corner,
        }
    }

    /// Rebuilds the rectangle from the handles and clamps it into the image.
    ///
    /// When clamping moved the rectangle the handles are re-synced to it.
    pub fn refresh(&mut self, width: usize, height: usize) -> bool {
        self.rect = Rect::from_center_corner(self.center, self.corner);
        let changed = clamp_rect_into_image(&mut self.rect, width, height);
        if changed {
            self.center = self.rect.center();
            self.corner = self.rect.max_corner();
        }
        changed
    }

    /// Moves the region to `center`, or redefines it when `corner` is given.
    ///
    /// Without a corner the size is kept and `center` is first pulled in by
    /// half the rectangle size so the whole rectangle stays in the image.
    pub fn set_points(&mut self, center: Point, corner: Option<Point>, width: usize, height: usize) -> bool {
        match corner {
            Some(corner) => {
                self.center = center;
                self.corner = corner;
            }
            None => {
                let b = self.bounds();
                let (setback_x, setback_y) = ((b.width / 2) as f64, (b.height / 2) as f64);
                let cx = center.x.max(setback_x).min(width as f64 - setback_x);
                let cy = center.y.max(setback_y).min(height as f64 - setback_y);
                let shift = Point::new(cx, cy) - self.center;
                self.center = self.center + shift;
                self.corner = self.corner + shift;
            }
        }
        self.refresh(width, height)
    }

    /// Restores cached handles.
    pub fn set_search_points(&mut self, points: SearchPoints, width: usize, height: usize) -> bool {
        self.set_points(points.center, Some(points.corner), width, height)
    }
}

impl Default for SearchRegion {
    fn default() -> Self {
        Self::new(Point::default(), Point::default())
    }
}

#[cfg(test)]
mod tests {
    use super::{clamp_rect_into_image, SearchRegion};
    use crate::geom::{Point, Rect};

    #[test]
    fn translate_only_keeps_size() {
        let mut r = SearchRegion::new(Point::new(50.0, 50.0), Point::new(70.0, 60.0));
        r.refresh(100, 100);
        r.set_points(Point::new(95.0, 5.0), None, 100, 100);
        let rect = r.rect();
        assert_eq!((rect.width, rect.height), (40.0, 20.0));
        assert_eq!(r.center(), Point::new(80.0, 10.0));
    }

    #[test]
    fn fractional_rect_inside_image_is_untouched() {
        let mut rect = Rect::new(1.5, 2.25, 10.7, 3.3);
        let before = rect;
        assert!(!clamp_rect_into_image(&mut rect, 50, 50));
        assert_eq!(rect, before);
    }

    #[test]
    fn fractional_width_does_not_overhang_the_edge() {
        let mut rect = Rect::new(89.75, 20.0, 10.5, 8.0);
        assert!(clamp_rect_into_image(&mut rect, 100, 100));
        assert_eq!(rect, Rect::new(89.5, 20.0, 10.5, 8.0));
        assert_eq!(rect.max_x(), 100.0);
    }

    #[test]
    fn oversized_axis_is_capped_independently() {
        let mut rect = Rect::new(-10.0, 5.0, 300.0, 20.0);
        assert!(clamp_rect_into_image(&mut rect, 100, 80));
        assert_eq!(rect, Rect::new(0.0, 5.0, 100.0, 20.0));
    }
}
