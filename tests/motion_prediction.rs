use autotrack::predict::{choose, predict, Extrapolation, LOOKBACK};
use autotrack::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn p(x: f64, y: f64) -> Option<Point> {
    Some(Point::new(x, y))
}

#[test]
fn two_priors_extrapolate_velocity() {
    let prior = [p(10.0, 10.0), p(8.0, 8.0), None, None];
    assert_eq!(
        choose(&prior),
        (Extrapolation::Velocity, Extrapolation::Velocity)
    );
    assert_eq!(predict(&prior, true, 100, 100), Some(Point::new(12.0, 12.0)));
}

#[test]
fn missing_latest_prior_gives_no_prediction() {
    let prior = [None, p(8.0, 8.0), p(6.0, 6.0), p(4.0, 4.0)];
    assert_eq!(predict(&prior, true, 100, 100), None);
}

#[test]
fn single_prior_is_held() {
    let prior = [p(17.5, 3.25), None, p(1.0, 1.0), None];
    assert_eq!(predict(&prior, true, 100, 100), Some(Point::new(17.5, 3.25)));
}

#[test]
fn disabled_look_ahead_holds_latest_position() {
    let prior = [p(10.0, 10.0), p(8.0, 8.0), p(6.0, 6.0), p(4.0, 4.0)];
    assert_eq!(predict(&prior, false, 100, 100), Some(Point::new(10.0, 10.0)));
}

#[test]
fn three_priors_extrapolate_quadratically() {
    // x = 2t^2 at t = 3, 2, 1; y is linear.
    let prior = [p(18.0, 30.0), p(8.0, 20.0), p(2.0, 10.0), None];
    assert_eq!(
        choose(&prior),
        (Extrapolation::Acceleration, Extrapolation::Acceleration)
    );
    assert_eq!(predict(&prior, true, 100, 100), Some(Point::new(32.0, 40.0)));
}

#[test]
fn steady_acceleration_with_four_priors_stays_quadratic() {
    let prior = [p(10.0, 1.0), p(7.0, 1.0), p(5.0, 1.0), p(4.0, 1.0)];
    let (ex, _) = choose(&prior);
    assert_eq!(ex, Extrapolation::Acceleration);
    assert_eq!(predict(&prior, true, 100, 100).map(|q| q.x), Some(14.0));
}

// The gates compare one difference with a mean over as few as one sample;
// an oscillating track fails both gates and falls back to holding.
#[test]
fn oscillation_fails_both_gates_and_holds() {
    let prior = [p(0.0, 5.0), p(1.0, 5.0), p(0.0, 5.0), p(1.0, 5.0)];
    let (ex, ey) = choose(&prior);
    assert_eq!(ex, Extrapolation::Hold);
    assert_eq!(ey, Extrapolation::Hold);
    assert_eq!(predict(&prior, true, 100, 100), Some(Point::new(0.0, 5.0)));
}

#[test]
fn prediction_is_clamped_into_image() {
    let prior = [p(98.0, 1.0), p(90.0, 9.0), None, None];
    assert_eq!(predict(&prior, true, 100, 60), Some(Point::new(100.0, 0.0)));
}

#[test]
fn predictions_stay_in_bounds() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..1000 {
        let width = rng.random_range(1..500usize);
        let height = rng.random_range(1..500usize);
        let mut prior = [None; LOOKBACK];
        for slot in prior.iter_mut() {
            if rng.random_bool(0.8) {
                *slot = p(
                    rng.random_range(-50.0..550.0),
                    rng.random_range(-50.0..550.0),
                );
            }
        }
        if let Some(q) = predict(&prior, true, width, height) {
            assert!((0.0..=width as f64).contains(&q.x), "{q:?} outside {width}");
            assert!((0.0..=height as f64).contains(&q.y), "{q:?} outside {height}");
        } else {
            assert!(prior[0].is_none());
        }
    }
}
