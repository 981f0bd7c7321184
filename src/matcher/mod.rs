//! The template-matcher contract consumed by the tracker.
//!
//! The tracker never inspects pixels itself: it hands a template and a search
//! rectangle to a [`Matcher`] and reads back a location and a [`MatchScore`].
//! [`SsdMatcher`] is the reference implementation.

use crate::geom::{IntRect, Point};
use crate::image::{ImageView, OwnedImage};
use crate::template::Template;

mod kernel;
mod line;
pub mod ssd;

pub use line::line_search_points;
pub use ssd::SsdMatcher;

/// Peak width and height of the most recent match.
///
/// `height` is the quality score compared against the match thresholds. A
/// perfect match has infinite height. A search that could not run reports a
/// NaN height; a 1-D search with no points on the line also reports a
/// negative width.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MatchScore {
    pub width: f64,
    pub height: f64,
}

impl MatchScore {
    /// Score of a search that could not be performed.
    pub const IMPOSSIBLE: MatchScore = MatchScore {
        width: f64::NAN,
        height: f64::NAN,
    };

    /// Score of a 1-D search whose line missed the search rectangle.
    pub const NO_LINE: MatchScore = MatchScore {
        width: -1.0,
        height: f64::NAN,
    };

    pub fn quality(&self) -> f64 {
        self.height
    }

    /// True when the matcher could not evaluate any placement.
    pub fn is_impossible(&self) -> bool {
        self.height.is_nan()
    }
}

/// A line through the image, used for 1-D searches along a coordinate axis.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AxisLine {
    pub origin: Point,
    /// Counter-clockwise angle from the image +x axis, in radians.
    pub angle: f64,
}

/// Locates a template inside a search rectangle and evolves that template.
pub trait Matcher {
    /// Replaces the template used by the next search.
    ///
    /// The new template must have the current template's dimensions.
    fn set_template(&mut self, template: &Template);

    /// Current (possibly evolved) template.
    fn template(&self) -> &Template;

    /// Best template location in `search`, as the top-left corner of the
    /// untrimmed template. Updates [`Matcher::match_score`].
    fn match_location(&mut self, image: ImageView<'_, u8>, search: IntRect) -> Option<Point>;

    /// Like [`Matcher::match_location`], restricted to placements on `line`
    /// widened by `spread` pixels on either side.
    fn match_location_on_line(
        &mut self,
        image: ImageView<'_, u8>,
        search: IntRect,
        line: AxisLine,
        spread: usize,
    ) -> Option<Point>;

    /// Peak width and height of the most recent search.
    fn match_score(&self) -> MatchScore;

    /// Overlays `image` at `evolve_alpha / 255` and then the original key-frame
    /// patch at `tether_alpha / 255` onto the working buffer, and derives a new
    /// template from it. `image` must have the key-frame patch dimensions.
    fn build_template(
        &mut self,
        image: ImageView<'_, u8>,
        evolve_alpha: u8,
        tether_alpha: u8,
    ) -> Option<&Template>;

    /// Alphas used to build the current template.
    fn alphas(&self) -> (u8, u8);

    /// Snapshot of the working buffer, reusing `reuse` when it fits.
    fn working_pixels(&self, reuse: Option<Vec<f32>>) -> Vec<f32>;

    /// Restores a working buffer taken with [`Matcher::working_pixels`].
    fn set_working_pixels(&mut self, pixels: &[f32]);

    /// Records the frame whose match produced the current template.
    fn set_index(&mut self, frame: usize);

    fn index(&self) -> usize;

    /// Identity used to detect that a key frame's matcher was replaced.
    fn id(&self) -> u64;

    /// Image patch of the most recent match, if the matcher keeps one.
    fn match_image(&self) -> Option<&OwnedImage> {
        None
    }
}

/// Creates the matcher for a key frame from its masked image patch.
pub trait MatcherFactory {
    type Matcher: Matcher;

    fn create(&mut self, patch: Template) -> Self::Matcher;
}

impl<M, F> MatcherFactory for F
where
    M: Matcher,
    F: FnMut(Template) -> M,
{
    type Matcher = M;

    fn create(&mut self, patch: Template) -> M {
        self(patch)
    }
}
