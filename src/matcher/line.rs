//! Placements along a line clipped to a search rectangle.

use super::AxisLine;
use crate::geom::{IntRect, Point};

const EPS: f64 = 1e-10;

/// Points along `line` inside `rect`, one per pixel cell the line crosses.
///
/// Each point is the midpoint between consecutive pixel-boundary crossings,
/// relative to the rectangle origin, ordered along the line from its left
/// (or, for a vertical line, top) end. Returns `None` when the line misses the
/// rectangle or only touches it at a single point.
pub fn line_search_points(rect: IntRect, line: AxisLine) -> Option<Vec<Point>> {
    let (mut dx, mut dy) = (line.angle.cos(), -line.angle.sin());
    if dx < -EPS || (dx.abs() <= EPS && dy < 0.0) {
        dx = -dx;
        dy = -dy;
    }
    let o = line.origin;
    let (x0, x1) = (rect.x as f64, rect.max_x() as f64);
    let (y0, y1) = (rect.y as f64, rect.max_y() as f64);

    let (mut t_min, mut t_max) = (f64::NEG_INFINITY, f64::INFINITY);
    for (start, d, lo, hi) in [(o.x, dx, x0, x1), (o.y, dy, y0, y1)] {
        if d.abs() <= EPS {
            if start < lo || start > hi {
                return None;
            }
            continue;
        }
        let (a, b) = ((lo - start) / d, (hi - start) / d);
        t_min = t_min.max(a.min(b));
        t_max = t_max.min(a.max(b));
    }
    if !(t_max - t_min > EPS) {
        return None;
    }

    let at = |t: f64| Point::new(o.x + t * dx, o.y + t * dy);
    let (p1, p2) = (at(t_min), at(t_max));
    let mut crossings = vec![t_min, t_max];
    for (start, d, a, b) in [(o.x, dx, p1.x, p2.x), (o.y, dy, p1.y, p2.y)] {
        if d.abs() <= EPS {
            continue;
        }
        let lo = a.min(b).ceil() as i64;
        let hi = a.max(b).floor() as i64;
        crossings.extend((lo..=hi).map(|v| (v as f64 - start) / d));
    }
    crossings.retain(|t| *t >= t_min && *t <= t_max);
    crossings.sort_by(f64::total_cmp);
    crossings.dedup_by(|a, b| (*a - *b).abs() < EPS);

    let points = crossings
        .windows(2)
        .map(|w| {
            let mid = at((w[0] + w[1]) / 2.0);
            Point::new(mid.x - x0, mid.y - y0)
        })
        .collect();
    Some(points)
}

#[cfg(test)]
mod tests {
    use super::line_search_points;
    use crate::geom::{IntRect, Point};
    use crate::matcher::AxisLine;

    #[test]
    fn horizontal_line_visits_each_column() {
        let rect = IntRect::new(10, 10, 5, 4);
        let line = AxisLine {
            origin: Point::new(0.0, 12.0),
            angle: 0.0,
        };
        let pts = line_search_points(rect, line).unwrap();
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[0], Point::new(0.5, 2.0));
        assert_eq!(pts[4], Point::new(4.5, 2.0));
    }

    #[test]
    fn vertical_line_runs_top_to_bottom() {
        let rect = IntRect::new(0, 0, 4, 3);
        let line = AxisLine {
            origin: Point::new(2.0, 50.0),
            angle: std::f64::consts::FRAC_PI_2,
        };
        let pts = line_search_points(rect, line).unwrap();
        assert_eq!(pts.len(), 3);
        assert!(pts[0].y < pts[2].y);
        assert!(pts.iter().all(|p| (p.x - 2.0).abs() < 1e-9));
    }

    #[test]
    fn line_outside_rect_has_no_points() {
        let rect = IntRect::new(10, 10, 5, 5);
        let line = AxisLine {
            origin: Point::new(0.0, 0.0),
            angle: 0.0,
        };
        assert!(line_search_points(rect, line).is_none());
    }

    #[test]
    fn diagonal_line_crosses_cells_in_order() {
        let rect = IntRect::new(0, 0, 4, 4);
        let line = AxisLine {
            origin: Point::new(0.0, 4.0),
            angle: std::f64::consts::FRAC_PI_4,
        };
        let pts = line_search_points(rect, line).unwrap();
        assert_eq!(pts.len(), 4);
        assert!(pts.windows(2).all(|w| w[0].x < w[1].x && w[0].y > w[1].y));
    }
}
