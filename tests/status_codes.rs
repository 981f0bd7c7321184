use autotrack::{classify, FrameFacts, StatusCode, Thresholds};

const THRESHOLDS: Thresholds = Thresholds {
    good: 4.0,
    possible: 1.0,
};

fn auto_marked(quality: f64) -> FrameFacts {
    FrameFacts {
        marked: true,
        auto_marked: true,
        searched: true,
        quality: Some(quality),
        ..FrameFacts::default()
    }
}

#[test]
fn quality_equal_to_good_is_weak() {
    assert_eq!(classify(&auto_marked(4.0), THRESHOLDS), StatusCode::AcceptedWeak);
    assert_eq!(
        classify(&auto_marked(4.0001), THRESHOLDS),
        StatusCode::AutoMarkedGood
    );
    assert_eq!(
        classify(&auto_marked(f64::INFINITY), THRESHOLDS),
        StatusCode::AutoMarkedGood
    );
}

#[test]
fn key_frame_wins_over_everything() {
    let facts = FrameFacts {
        is_key_frame: true,
        ..auto_marked(9.0)
    };
    assert_eq!(classify(&facts, THRESHOLDS), StatusCode::KeyFrame);
}

#[test]
fn unmarked_frames_split_on_possible_threshold() {
    let searched = |q: f64| FrameFacts {
        searched: true,
        quality: Some(q),
        ..FrameFacts::default()
    };
    assert_eq!(classify(&searched(1.0), THRESHOLDS), StatusCode::PossibleUnmarked);
    assert_eq!(classify(&searched(0.99), THRESHOLDS), StatusCode::NoMatch);

    let never = FrameFacts::default();
    assert_eq!(classify(&never, THRESHOLDS), StatusCode::NeverSearched);

    let impossible = FrameFacts {
        quality: Some(f64::NAN),
        ..FrameFacts::default()
    };
    assert_eq!(classify(&impossible, THRESHOLDS), StatusCode::SearchImpossible);
}

#[test]
fn user_marked_frames() {
    let marked = |calibration: bool, decided: bool, q: f64| FrameFacts {
        marked: true,
        calibration_tool: calibration,
        searched: true,
        decided,
        quality: Some(q),
        ..FrameFacts::default()
    };
    assert_eq!(classify(&marked(false, true, 0.5), THRESHOLDS), StatusCode::ManuallyMarked);
    assert_eq!(classify(&marked(false, false, 2.0), THRESHOLDS), StatusCode::PossibleMarked);
    assert_eq!(classify(&marked(false, false, 1.0), THRESHOLDS), StatusCode::NoMatchMarked);
    assert_eq!(classify(&marked(true, true, 2.0), THRESHOLDS), StatusCode::PossibleMarked);
    assert_eq!(classify(&marked(true, true, 1.0), THRESHOLDS), StatusCode::NoMatchMarked);

    let unsearched = FrameFacts {
        searched: false,
        ..marked(false, true, 5.0)
    };
    assert_eq!(classify(&unsearched, THRESHOLDS), StatusCode::NeverSearched);
}

#[test]
fn classify_is_total() {
    let qualities = [
        None,
        Some(f64::NAN),
        Some(0.0),
        Some(1.0),
        Some(2.5),
        Some(4.0),
        Some(7.0),
        Some(f64::INFINITY),
    ];
    let flags = [false, true];
    let mut seen = [false; 11];
    for &is_key_frame in &flags {
        for &marked in &flags {
            for &auto in &flags {
                for &calibration_tool in &flags {
                    for &searched in &flags {
                        for &decided in &flags {
                            for &quality in &qualities {
                                let facts = FrameFacts {
                                    is_key_frame,
                                    marked,
                                    auto_marked: auto,
                                    calibration_tool,
                                    searched,
                                    decided,
                                    quality,
                                };
                                let code = classify(&facts, THRESHOLDS);
                                assert_eq!(StatusCode::from_code(code.code()), Some(code));
                                seen[code.code() as usize] = true;
                            }
                        }
                    }
                }
            }
        }
    }
    let produced: Vec<u8> = (0..11u8).filter(|&c| seen[c as usize]).collect();
    assert_eq!(produced, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
}

#[test]
fn codes_round_trip_and_describe() {
    for code in 0..=10u8 {
        let status = StatusCode::from_code(code).unwrap();
        assert_eq!(status.code(), code);
        assert!(!status.describe().is_empty());
        assert!(status.to_string().starts_with(&code.to_string()));
    }
    assert_eq!(StatusCode::from_code(11), None);
}
