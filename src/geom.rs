//! Image-space geometry: points, floating rectangles and integer bounds.
//!
//! Coordinates follow image conventions: `x` grows to the right, `y` grows
//! downward, and the origin is the top-left corner of the frame.

use std::ops::{Add, Sub};

/// A point (or displacement) in image pixel coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Sine of the counter-clockwise angle from the +x axis to `other`.
    ///
    /// Image `y` points down, so the sign is flipped. NaN when the points coincide.
    pub fn sin_to(self, other: Point) -> f64 {
        (self.y - other.y) / self.distance(other)
    }

    /// Cosine of the counter-clockwise angle from the +x axis to `other`.
    pub fn cos_to(self, other: Point) -> f64 {
        (other.x - self.x) / self.distance(other)
    }

    /// Returns true when both coordinates are within `tol` of `other`.
    pub fn approx_eq(self, other: Point, tol: f64) -> bool {
        (self.x - other.x).abs() < tol && (self.y - other.y).abs() < tol
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle with floating-point origin and size.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle centred on `center` with `corner` as one of its corners.
    pub fn from_center_corner(center: Point, corner: Point) -> Self {
        let half_w = (corner.x - center.x).abs();
        let half_h = (corner.y - center.y).abs();
        Self::new(
            center.x - half_w,
            center.y - half_h,
            2.0 * half_w,
            2.0 * half_h,
        )
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Bottom-right corner.
    pub fn max_corner(&self) -> Point {
        Point::new(self.max_x(), self.max_y())
    }

    /// Smallest integer rectangle that encloses this one.
    pub fn bounds(&self) -> IntRect {
        let x0 = self.x.floor();
        let y0 = self.y.floor();
        let x1 = self.max_x().ceil();
        let y1 = self.max_y().ceil();
        IntRect::new(x0 as i64, y0 as i64, (x1 - x0) as i64, (y1 - y0) as i64)
    }
}

/// Axis-aligned rectangle on the pixel grid. Width and height may be zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl IntRect {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> i64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> i64 {
        self.y + self.height
    }
}
