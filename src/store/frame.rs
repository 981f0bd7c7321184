//! Per-frame tracking records.

use crate::geom::Point;
use crate::image::OwnedImage;
use crate::matcher::MatchScore;
use crate::template::{EllipseMask, Template};

/// Centre, corner and raw matcher location of a successful match.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MatchPoints {
    /// Mask centre at the match.
    pub center: Point,
    /// Mask corner handle at the match.
    pub corner: Point,
    /// Top-left of the key-frame patch at the match, as the matcher reported it.
    pub location: Point,
}

/// Centre and corner of the search rectangle used on a frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SearchPoints {
    pub center: Point,
    pub corner: Point,
}

/// Cached tracking state for one (track, point index, frame).
#[derive(Clone, Debug, Default)]
pub struct FrameData {
    pub frame: usize,
    pub index: usize,
    /// Template this frame was (or will be) matched with.
    pub template: Option<Template>,
    /// Evolve alpha the matcher reported when `template` was captured.
    pub template_alpha: u8,
    /// Identity of the matcher `template` was captured from.
    pub matcher_id: Option<u64>,
    /// Matcher working buffer at capture, needed to evolve from this frame.
    pub working_pixels: Option<Vec<f32>>,
    pub match_score: Option<MatchScore>,
    pub match_points: Option<MatchPoints>,
    pub search_points: Option<SearchPoints>,
    /// Where the tracker placed the mark, to detect later user edits.
    pub auto_mark: Option<Point>,
    /// The search region was matched at least once.
    pub searched: bool,
    /// The user accepted, skipped or edited this frame's result.
    pub decided: bool,
    pub match_image: Option<OwnedImage>,
}

impl FrameData {
    pub fn new(index: usize, frame: usize) -> Self {
        Self {
            frame,
            index,
            ..Self::default()
        }
    }

    /// Forgets match results. Key frames keep their template and search points.
    pub fn clear(&mut self, is_key_frame: bool) {
        self.match_points = None;
        self.match_score = None;
        self.match_image = None;
        self.auto_mark = None;
        self.searched = false;
        self.decided = false;
        self.working_pixels = None;
        self.matcher_id = None;
        if !is_key_frame {
            self.search_points = None;
            self.template_alpha = 0;
            self.template = None;
        }
    }

    /// True when the track's mark still sits where the tracker put it.
    pub fn is_auto_marked(&self, marked: Option<Point>) -> bool {
        match (self.auto_mark, marked) {
            (Some(auto), Some(mark)) => auto.approx_eq(mark, 0.01),
            _ => false,
        }
    }

    pub fn quality(&self) -> Option<f64> {
        self.match_score.map(|s| s.quality())
    }
}

/// Mask, target offset and matcher defined by the user on a key frame.
#[derive(Clone, Debug)]
pub struct KeyFrameData<M> {
    pub mask_center: Point,
    pub mask_corner: Point,
    pub mask: EllipseMask,
    /// Target position minus mask centre.
    pub target_offset: Point,
    /// Created on first search from this key frame's image.
    pub matcher: Option<M>,
}

impl<M> KeyFrameData<M> {
    pub fn new(mask_center: Point, mask_corner: Point, min_radius: f64) -> Self {
        Self {
            mask_center,
            mask_corner,
            mask: EllipseMask::from_handles(mask_center, mask_corner, min_radius),
            target_offset: Point::default(),
            matcher: None,
        }
    }

    /// Moves the mask handles; the matcher is dropped and rebuilt on demand.
    pub fn set_mask_points(&mut self, center: Point, corner: Point, min_radius: f64) {
        self.mask_center = center;
        self.mask_corner = corner;
        self.mask = EllipseMask::from_handles(center, corner, min_radius);
        self.matcher = None;
    }

    /// Mask corner handle for a match whose mask centre is `center`.
    pub fn match_corner(&self, center: Point) -> Point {
        let f = crate::template::CORNER_FACTOR;
        Point::new(
            center.x + f * (self.mask_corner.x - self.mask_center.x),
            center.y + f * (self.mask_corner.y - self.mask_center.y),
        )
    }
}

/// A frame record: plain, or a key frame carrying its user-defined extras.
#[derive(Clone, Debug)]
pub enum FrameRecord<M> {
    Plain(FrameData),
    Key(FrameData, Box<KeyFrameData<M>>),
}

impl<M> FrameRecord<M> {
    pub fn data(&self) -> &FrameData {
        match self {
            FrameRecord::Plain(d) | FrameRecord::Key(d, _) => d,
        }
    }

    pub fn data_mut(&mut self) -> &mut FrameData {
        match self {
            FrameRecord::Plain(d) | FrameRecord::Key(d, _) => d,
        }
    }

    pub fn key(&self) -> Option<&KeyFrameData<M>> {
        match self {
            FrameRecord::Key(_, k) => Some(k),
            FrameRecord::Plain(_) => None,
        }
    }

    pub fn key_mut(&mut self) -> Option<&mut KeyFrameData<M>> {
        match self {
            FrameRecord::Key(_, k) => Some(k),
            FrameRecord::Plain(_) => None,
        }
    }

    pub fn is_key_frame(&self) -> bool {
        matches!(self, FrameRecord::Key(..))
    }

    pub fn clear(&mut self) {
        let is_key = self.is_key_frame();
        self.data_mut().clear(is_key);
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameData, KeyFrameData, SearchPoints};
    use crate::geom::Point;
    use crate::matcher::MatchScore;

    #[test]
    fn clear_keeps_key_frame_search_points() {
        let mut d = FrameData::new(0, 3);
        d.search_points = Some(SearchPoints {
            center: Point::new(1.0, 1.0),
            corner: Point::new(2.0, 2.0),
        });
        d.match_score = Some(MatchScore {
            width: 1.0,
            height: 5.0,
        });
        d.searched = true;
        let mut key = d.clone();
        d.clear(false);
        key.clear(true);
        assert!(d.search_points.is_none());
        assert!(key.search_points.is_some());
        assert!(!key.searched && key.match_score.is_none());
    }

    #[test]
    fn auto_mark_tolerates_tiny_drift() {
        let mut d = FrameData::new(0, 0);
        d.auto_mark = Some(Point::new(10.0, 10.0));
        assert!(d.is_auto_marked(Some(Point::new(10.005, 9.996))));
        assert!(!d.is_auto_marked(Some(Point::new(10.02, 10.0))));
        assert!(!d.is_auto_marked(None));
    }

    #[test]
    fn match_corner_scales_handle_offset() {
        let k: KeyFrameData<()> =
            KeyFrameData::new(Point::new(0.0, 0.0), Point::new(10.0, 20.0), 4.0);
        assert_eq!(k.match_corner(Point::new(5.0, 5.0)), Point::new(14.0, 23.0));
    }
}
