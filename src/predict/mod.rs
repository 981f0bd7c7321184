//! Finite-difference motion prediction.
//!
//! Prior positions are passed most recent first. Each axis picks its own
//! extrapolation order, gated by how stable the next-higher difference is
//! compared with the mean of the lower one.

use crate::geom::Point;

/// Number of prior positions consulted.
pub const LOOKBACK: usize = 4;

/// Difference buffers hold one entry fewer than the look-back depth.
pub type Differences = [Option<Point>; LOOKBACK - 1];

/// First differences: `p[i] - p[i + 1]`.
pub fn velocities(prior: &[Option<Point>; LOOKBACK]) -> Differences {
    let mut out = [None; LOOKBACK - 1];
    for (i, slot) in out.iter_mut().enumerate() {
        if let (Some(p0), Some(p1)) = (prior[i], prior[i + 1]) {
            *slot = Some(p0 - p1);
        }
    }
    out
}

/// Second differences: `p[i] - 2 p[i + 1] + p[i + 2]`.
pub fn accelerations(prior: &[Option<Point>; LOOKBACK]) -> Differences {
    let mut out = [None; LOOKBACK - 1];
    for (i, slot) in out.iter_mut().enumerate().take(LOOKBACK - 2) {
        if let (Some(p0), Some(p1), Some(p2)) = (prior[i], prior[i + 1], prior[i + 2]) {
            *slot = Some(Point::new(
                p0.x - 2.0 * p1.x + p2.x,
                p0.y - 2.0 * p1.y + p2.y,
            ));
        }
    }
    out
}

/// Third differences: `p[i] - 3 p[i + 1] + 3 p[i + 2] - p[i + 3]`.
pub fn jerks(prior: &[Option<Point>; LOOKBACK]) -> Differences {
    let mut out = [None; LOOKBACK - 1];
    for (i, slot) in out.iter_mut().enumerate().take(LOOKBACK - 3) {
        if let (Some(p0), Some(p1), Some(p2), Some(p3)) =
            (prior[i], prior[i + 1], prior[i + 2], prior[i + 3])
        {
            *slot = Some(Point::new(
                p0.x - 3.0 * p1.x + 3.0 * p2.x - p3.x,
                p0.y - 3.0 * p1.y + 3.0 * p2.y - p3.y,
            ));
        }
    }
    out
}

/// Absolute value of the signed per-axis mean over the present samples.
///
/// NaN on both axes when no sample is present, which fails every `<` gate.
pub fn mean_magnitude(samples: &Differences) -> Point {
    let (mut sum, mut n) = (Point::default(), 0usize);
    for p in samples.iter().flatten() {
        sum = sum + *p;
        n += 1;
    }
    let n = n as f64;
    Point::new((sum.x / n).abs(), (sum.y / n).abs())
}

/// Extrapolation order chosen for one axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Extrapolation {
    Hold,
    Velocity,
    Acceleration,
}

/// Predicts the next position and clamps it into `[0, width] x [0, height]`.
///
/// Returns `None` when the most recent prior position is missing.
pub fn predict(
    prior: &[Option<Point>; LOOKBACK],
    look_ahead: bool,
    width: usize,
    height: usize,
) -> Option<Point> {
    let p0 = prior[0]?;
    let mut predicted = p0;

    if look_ahead {
        if let Some(p1) = prior[1] {
            let (ex, ey) = choose(prior);
            predicted.x = extrapolate(ex, p0.x, p1.x, prior[2].map(|p| p.x));
            predicted.y = extrapolate(ey, p0.y, p1.y, prior[2].map(|p| p.y));
        }
    }

    Some(Point::new(
        predicted.x.max(0.0).min(width as f64),
        predicted.y.max(0.0).min(height as f64),
    ))
}

/// Per-axis extrapolation orders for `prior`.
pub fn choose(prior: &[Option<Point>; LOOKBACK]) -> (Extrapolation, Extrapolation) {
    let veloc = velocities(prior);
    let accel = accelerations(prior);
    let jerk = jerks(prior);
    let v_mean = mean_magnitude(&veloc);
    let a_mean = mean_magnitude(&accel);

    let has_third = prior[2].is_some();
    let has_fourth = prior[3].is_some();
    let a0 = accel[0].unwrap_or(Point::new(f64::NAN, f64::NAN));
    let j0 = jerk[0].unwrap_or(Point::new(f64::NAN, f64::NAN));

    let axis = |a: f64, j: f64, vm: f64, am: f64| {
        let accel_valid = has_third && (!has_fourth || j.abs() < am);
        let veloc_valid = !has_third || a.abs() < vm;
        if accel_valid {
            Extrapolation::Acceleration
        } else if veloc_valid {
            Extrapolation::Velocity
        } else {
            Extrapolation::Hold
        }
    };
    (
        axis(a0.x, j0.x, v_mean.x, a_mean.x),
        axis(a0.y, j0.y, v_mean.y, a_mean.y),
    )
}

fn extrapolate(kind: Extrapolation, x0: f64, x1: f64, x2: Option<f64>) -> f64 {
    match (kind, x2) {
        (Extrapolation::Acceleration, Some(x2)) => 3.0 * x0 - 3.0 * x1 + x2,
        (Extrapolation::Velocity, _) => 2.0 * x0 - x1,
        _ => x0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Option<Point> {
        Some(Point::new(x, y))
    }

    #[test]
    fn differences_follow_available_samples() {
        let prior = [p(10.0, 0.0), p(7.0, 0.0), p(5.0, 0.0), None];
        assert_eq!(velocities(&prior), [p(3.0, 0.0), p(2.0, 0.0), None]);
        assert_eq!(accelerations(&prior), [p(1.0, 0.0), None, None]);
        assert_eq!(jerks(&prior), [None, None, None]);
    }

    #[test]
    fn constant_acceleration_is_extrapolated_quadratically() {
        // x = t^2 at t = 4, 3, 2, 1
        let prior = [p(16.0, 5.0), p(9.0, 5.0), p(4.0, 5.0), p(1.0, 5.0)];
        let (ex, _) = choose(&prior);
        assert_eq!(ex, Extrapolation::Acceleration);
        let out = predict(&prior, true, 100, 100).unwrap();
        assert_eq!(out, Point::new(25.0, 5.0));
    }

    #[test]
    fn mean_of_no_samples_is_nan() {
        let m = mean_magnitude(&[None, None, None]);
        assert!(m.x.is_nan() && m.y.is_nan());
    }
}
