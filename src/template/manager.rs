//! Per-frame template caching and evolution.

use crate::geom::IntRect;
use crate::image::{sample_region, ImageView};
use crate::matcher::Matcher;
use crate::store::FrameData;
use crate::template::Template;
use crate::trace::trace_debug;

/// Decides when a frame's cached template is replaced and how templates evolve.
///
/// Pixel blending itself is left to the [`Matcher`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TemplateManager {
    pub evolve_alpha: u8,
    pub tether_alpha: u8,
}

impl TemplateManager {
    pub fn new(evolve_alpha: u8, tether_alpha: u8) -> Self {
        Self {
            evolve_alpha,
            tether_alpha,
        }
    }

    /// Caches the matcher's current template on `frame`.
    pub fn capture<M: Matcher>(frame: &mut FrameData, matcher: &M) {
        frame.template = Some(matcher.template().clone());
        frame.template_alpha = matcher.alphas().0;
        frame.working_pixels = Some(matcher.working_pixels(frame.working_pixels.take()));
        frame.matcher_id = Some(matcher.id());
        frame.match_image = None;
    }

    /// True when the matcher holds a different template that was evolved
    /// on an earlier frame. Key frames never go stale.
    pub fn is_stale<M: Matcher>(frame: &FrameData, is_key_frame: bool, matcher: &M) -> bool {
        if is_key_frame {
            return false;
        }
        let different =
            matcher.alphas().0 != frame.template_alpha || frame.matcher_id != Some(matcher.id());
        different && matcher.index() < frame.frame
    }

    /// Template to match `frame` with, refreshed from `matcher` when missing or stale.
    pub fn current_template<'a, M: Matcher>(
        frame: &'a mut FrameData,
        is_key_frame: bool,
        matcher: &M,
    ) -> Option<&'a Template> {
        if frame.template.is_none() || Self::is_stale(frame, is_key_frame, matcher) {
            Self::capture(frame, matcher);
        }
        frame.template.as_ref()
    }

    /// Evolves the matcher's template from the match cached on `frame`.
    ///
    /// The region at the match location, sized like the key-frame mask bounds,
    /// is blended into the template `frame` was matched with. Returns false when
    /// `frame` has no match.
    pub fn evolve<M: Matcher>(
        &self,
        frame: &FrameData,
        matcher: &mut M,
        image: ImageView<'_, u8>,
        mask_bounds: IntRect,
    ) -> bool {
        let Some(points) = frame.match_points else {
            return false;
        };
        if let Some(template) = &frame.template {
            matcher.set_template(template);
        }
        if let Some(pixels) = &frame.working_pixels {
            matcher.set_working_pixels(pixels);
        }
        let x = points.location.x.round() as i64;
        let y = points.location.y.round() as i64;
        let (w, h) = (mask_bounds.width.max(0) as usize, mask_bounds.height.max(0) as usize);
        let Ok(region) = sample_region(image, x, y, w, h, 0) else {
            return false;
        };
        let evolved = matcher
            .build_template(region.view(), self.evolve_alpha, self.tether_alpha)
            .is_some();
        matcher.set_index(frame.frame);
        trace_debug!(
            "template_evolved",
            frame = frame.frame,
            evolved = evolved,
            evolve_alpha = self.evolve_alpha,
        );
        evolved
    }
}

#[cfg(test)]
mod tests {
    use super::TemplateManager;
    use crate::geom::{IntRect, Point};
    use crate::image::OwnedImage;
    use crate::matcher::{Matcher, SsdMatcher};
    use crate::store::{FrameData, MatchPoints};
    use crate::template::Template;

    fn matcher() -> SsdMatcher {
        let patch = OwnedImage::from_fn(4, 4, |x, y| (10 * (x + y)) as u8).unwrap();
        SsdMatcher::new(Template::opaque(patch))
    }

    #[test]
    fn capture_records_identity_and_alpha() {
        let m = matcher();
        let mut frame = FrameData::new(0, 3);
        TemplateManager::capture(&mut frame, &m);
        assert_eq!(frame.matcher_id, Some(m.id()));
        assert_eq!(frame.template_alpha, 255);
        assert!(frame.working_pixels.is_some());
        assert!(!TemplateManager::is_stale(&frame, false, &m));
    }

    #[test]
    fn later_evolution_does_not_replace_earlier_frames() {
        let mut m = matcher();
        let mut early = FrameData::new(0, 2);
        TemplateManager::capture(&mut early, &m);
        let source = OwnedImage::filled(20, 20, 100).unwrap();
        let mut matched = FrameData::new(0, 5);
        TemplateManager::capture(&mut matched, &m);
        matched.match_points = Some(MatchPoints {
            center: Point::new(5.0, 5.0),
            corner: Point::new(7.0, 7.0),
            location: Point::new(3.0, 3.0),
        });
        let manager = TemplateManager::new(63, 0);
        assert!(manager.evolve(&matched, &mut m, source.view(), IntRect::new(0, 0, 4, 4)));
        assert_eq!(m.index(), 5);
        assert!(!TemplateManager::is_stale(&early, false, &m));
        let late = FrameData {
            template: early.template.clone(),
            template_alpha: early.template_alpha,
            matcher_id: early.matcher_id,
            ..FrameData::new(0, 6)
        };
        assert!(TemplateManager::is_stale(&late, false, &m));
        assert!(!TemplateManager::is_stale(&late, true, &m));
    }

    #[test]
    fn evolve_needs_a_match() {
        let mut m = matcher();
        let frame = FrameData::new(0, 1);
        let source = OwnedImage::filled(8, 8, 0).unwrap();
        let manager = TemplateManager::new(63, 0);
        assert!(!manager.evolve(&frame, &mut m, source.view(), IntRect::new(0, 0, 4, 4)));
    }
}
