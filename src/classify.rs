//! Status codes for per-frame tracking state.

use std::fmt;

/// Classification of a frame, codes 0 through 10.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    KeyFrame = 0,
    AutoMarkedGood = 1,
    PossibleUnmarked = 2,
    NoMatch = 3,
    SearchImpossible = 4,
    ManuallyMarked = 5,
    AcceptedWeak = 6,
    NeverSearched = 7,
    PossibleMarked = 8,
    NoMatchMarked = 9,
    /// Possible match on a calibration tool. Hosts may display it; [`classify`]
    /// reports calibration tools through 8 and 9.
    CalibrationPossible = 10,
}

impl StatusCode {
    pub const ALL: [StatusCode; 11] = [
        StatusCode::KeyFrame,
        StatusCode::AutoMarkedGood,
        StatusCode::PossibleUnmarked,
        StatusCode::NoMatch,
        StatusCode::SearchImpossible,
        StatusCode::ManuallyMarked,
        StatusCode::AcceptedWeak,
        StatusCode::NeverSearched,
        StatusCode::PossibleMarked,
        StatusCode::NoMatchMarked,
        StatusCode::CalibrationPossible,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Short human-readable description.
    pub fn describe(self) -> &'static str {
        match self {
            StatusCode::KeyFrame => "key frame",
            StatusCode::AutoMarkedGood => "marked automatically, good match",
            StatusCode::PossibleUnmarked => "possible match, not marked",
            StatusCode::NoMatch => "no match found",
            StatusCode::SearchImpossible => "search region unusable",
            StatusCode::ManuallyMarked => "marked by user",
            StatusCode::AcceptedWeak => "accepted, weak match",
            StatusCode::NeverSearched => "never searched",
            StatusCode::PossibleMarked => "possible match, already marked",
            StatusCode::NoMatchMarked => "no match, already marked",
            StatusCode::CalibrationPossible => "calibration tool, possible match",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.describe())
    }
}

/// Everything the classifier looks at for one frame.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FrameFacts {
    pub is_key_frame: bool,
    pub marked: bool,
    pub auto_marked: bool,
    pub calibration_tool: bool,
    pub searched: bool,
    pub decided: bool,
    /// Matcher quality, `None` when no score was ever stored.
    pub quality: Option<f64>,
}

/// Match-quality thresholds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Thresholds {
    pub good: f64,
    pub possible: f64,
}

impl Thresholds {
    /// Auto-marking accepts an infinite score or one at least `good`.
    pub fn accepts(&self, quality: f64) -> bool {
        quality == f64::INFINITY || quality >= self.good
    }
}

/// Maps frame state to a status code. Total over every input.
pub fn classify(facts: &FrameFacts, thresholds: Thresholds) -> StatusCode {
    if facts.is_key_frame {
        return StatusCode::KeyFrame;
    }
    let quality = facts.quality.unwrap_or(f64::NAN);
    if facts.marked {
        if facts.auto_marked {
            return if quality > thresholds.good {
                StatusCode::AutoMarkedGood
            } else {
                StatusCode::AcceptedWeak
            };
        }
        if !facts.searched {
            return StatusCode::NeverSearched;
        }
        if !facts.calibration_tool && facts.decided {
            return StatusCode::ManuallyMarked;
        }
        return if quality > thresholds.possible {
            StatusCode::PossibleMarked
        } else {
            StatusCode::NoMatchMarked
        };
    }
    if facts.searched {
        return if quality >= thresholds.possible {
            StatusCode::PossibleUnmarked
        } else {
            StatusCode::NoMatch
        };
    }
    match facts.quality {
        None => StatusCode::NeverSearched,
        Some(_) => StatusCode::SearchImpossible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Thresholds = Thresholds {
        good: 4.0,
        possible: 1.0,
    };

    #[test]
    fn calibration_tools_ignore_decided_flag() {
        let facts = FrameFacts {
            marked: true,
            calibration_tool: true,
            searched: true,
            decided: true,
            quality: Some(2.0),
            ..FrameFacts::default()
        };
        assert_eq!(classify(&facts, T), StatusCode::PossibleMarked);
        let plain = FrameFacts {
            calibration_tool: false,
            ..facts
        };
        assert_eq!(classify(&plain, T), StatusCode::ManuallyMarked);
    }

    #[test]
    fn possible_threshold_is_strict_when_marked() {
        let facts = FrameFacts {
            marked: true,
            searched: true,
            quality: Some(1.0),
            ..FrameFacts::default()
        };
        assert_eq!(classify(&facts, T), StatusCode::NoMatchMarked);
        let unmarked = FrameFacts {
            marked: false,
            ..facts
        };
        assert_eq!(classify(&unmarked, T), StatusCode::PossibleUnmarked);
    }

    #[test]
    fn codes_round_trip_through_numbers() {
        for code in StatusCode::ALL {
            assert_eq!(StatusCode::from_code(code.code()), Some(code));
        }
        assert_eq!(StatusCode::from_code(11), None);
    }

    #[test]
    fn accepts_infinite_quality() {
        assert!(T.accepts(f64::INFINITY));
        assert!(T.accepts(4.0));
        assert!(!T.accepts(3.99));
        assert!(!T.accepts(f64::NAN));
    }
}
