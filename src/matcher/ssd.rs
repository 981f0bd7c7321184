//! Reference matcher: masked sum of squared differences with peak-height quality.
//!
//! For every placement in the search rectangle the masked SSD against the
//! template is computed. The best placement is the minimum; its quality is
//! `mean / min - 1`, the height of the dip relative to the average, which is
//! infinite for an exact match. The location is refined to sub-pixel accuracy
//! by fitting a Gaussian through the peak heights of the best placement and
//! its two neighbours on each axis.

use std::sync::atomic::{AtomicU64, Ordering};

use super::kernel::{masked_ssd_at, ssd_grid};
use super::line::line_search_points;
use super::{AxisLine, MatchScore, Matcher};
use crate::geom::{IntRect, Point};
use crate::image::{sample_region, ImageView, OwnedImage};
use crate::template::Template;
use crate::trace::{trace_debug, trace_span};
use crate::util::math::gaussian_peak;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Template matcher bound to one key-frame patch.
#[derive(Clone, Debug)]
pub struct SsdMatcher {
    id: u64,
    original: OwnedImage,
    mask: Vec<bool>,
    working: Vec<f32>,
    template: Template,
    trim: (usize, usize),
    alphas: (u8, u8),
    index: usize,
    score: MatchScore,
    match_image: Option<OwnedImage>,
    #[cfg_attr(not(feature = "rayon"), allow(dead_code))]
    parallel: bool,
}

/// Search rectangle shrunk so every placement keeps the template inside the image.
struct Trimmed {
    rect: IntRect,
    left: i64,
    top: i64,
}

impl SsdMatcher {
    /// Creates a matcher whose template is the opaque part of `patch`.
    pub fn new(patch: Template) -> Self {
        let (w, h) = (patch.width(), patch.height());
        let mask = patch.mask().to_vec();
        let (template, trim) = trimmed_template(patch.image(), &mask);
        let mut matcher = Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            working: vec![0.0; w * h],
            original: patch.image().clone(),
            mask,
            template,
            trim,
            alphas: (0, 0),
            index: 0,
            score: MatchScore::IMPOSSIBLE,
            match_image: None,
            parallel: false,
        };
        let original = matcher.original.clone();
        matcher.build_template(original.view(), 255, 0);
        matcher
    }

    /// Evaluates full-rectangle searches on the rayon pool when the `rayon`
    /// feature is enabled.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Offset of the trimmed template inside the key-frame patch.
    pub fn trim(&self) -> (usize, usize) {
        self.trim
    }

    fn trim_search(&self, image: ImageView<'_, u8>, search: IntRect) -> Option<Trimmed> {
        let (tw, th) = (self.template.width() as i64, self.template.height() as i64);
        let (iw, ih) = (image.width() as i64, image.height() as i64);
        let left = tw / 2;
        let right = left + tw % 2;
        let top = th / 2;
        let bottom = top + th % 2;
        let x = left.max((iw - right).min(search.x));
        let y = top.max((ih - bottom).min(search.y));
        let width = (iw - x - right).min(search.width);
        let height = (ih - y - bottom).min(search.height);
        (width > 0 && height > 0).then_some(Trimmed {
            rect: IntRect::new(x, y, width, height),
            left,
            top,
        })
    }

    /// Image region covering every placement of the trimmed search.
    fn test_window<'a>(&self, image: ImageView<'a, u8>, t: &Trimmed) -> Option<ImageView<'a, u8>> {
        let x0 = t.rect.x - t.left;
        let y0 = t.rect.y - t.top;
        let w = t.rect.width as usize + self.template.width();
        let h = t.rect.height as usize + self.template.height();
        image.roi(x0 as usize, y0 as usize, w, h).ok()
    }

    /// Converts a best placement in window coordinates to an image location.
    fn finish(&mut self, image: ImageView<'_, u8>, t: &Trimmed, best: (i64, i64), delta: Point) -> Point {
        let tx = best.0 + t.rect.x - t.left;
        let ty = best.1 + t.rect.y - t.top;
        self.match_image = sample_region(
            image,
            tx,
            ty,
            self.template.width(),
            self.template.height(),
            0,
        )
        .ok();
        Point::new(
            (tx - self.trim.0 as i64) as f64 + delta.x,
            (ty - self.trim.1 as i64) as f64 + delta.y,
        )
    }

    fn grid(&self, window: ImageView<'_, u8>, cols: usize, rows: usize) -> Vec<f64> {
        #[cfg(feature = "rayon")]
        {
            if self.parallel {
                return super::kernel::ssd_grid_par(window, &self.template, cols, rows);
            }
        }
        ssd_grid(window, &self.template, cols, rows)
    }
}

impl Matcher for SsdMatcher {
    fn set_template(&mut self, template: &Template) {
        if template.width() == self.template.width() && template.height() == self.template.height() {
            self.template = template.clone();
        }
    }

    fn template(&self) -> &Template {
        &self.template
    }

    fn match_location(&mut self, image: ImageView<'_, u8>, search: IntRect) -> Option<Point> {
        let _span = trace_span!("match_location").entered();
        let Some(trimmed) = self.trim_search(image, search) else {
            self.score = MatchScore::IMPOSSIBLE;
            return None;
        };
        let Some(window) = self.test_window(image, &trimmed) else {
            self.score = MatchScore::IMPOSSIBLE;
            return None;
        };
        let cols = trimmed.rect.width as usize + 1;
        let rows = trimmed.rect.height as usize + 1;
        let grid = self.grid(window, cols, rows);

        // Column-major visit keeps the first minimum in x-then-y order.
        let mut best = (0usize, 0usize);
        let mut min = f64::INFINITY;
        let mut total = 0.0;
        for x in 0..cols {
            for y in 0..rows {
                let d = grid[y * cols + x];
                total += d;
                if d < min {
                    min = d;
                    best = (x, y);
                }
            }
        }
        let mean = total / (trimmed.rect.width * trimmed.rect.height) as f64;
        let peak = mean / min - 1.0;
        let height_at = |x: i64, y: i64| mean / masked_ssd_at(window, &self.template, x, y) - 1.0;

        let mut delta = Point::default();
        let mut width = f64::NAN;
        if !peak.is_infinite() {
            let (bx, by) = (best.0 as i64, best.1 as i64);
            let offsets = [-1.0, 0.0, 1.0];
            let fx = gaussian_peak(offsets, [height_at(bx - 1, by), peak, height_at(bx + 1, by)]);
            let fy = gaussian_peak(offsets, [height_at(bx, by - 1), peak, height_at(bx, by + 1)]);
            if let Some((dx, _)) = fx {
                delta.x = dx;
            }
            if let Some((dy, _)) = fy {
                delta.y = dy;
            }
            if let (Some((_, wx)), Some((_, wy))) = (fx, fy) {
                width = (wx + wy) / 2.0;
            }
        }
        self.score = MatchScore {
            width,
            height: peak,
        };
        trace_debug!("match_scored", quality = peak, min_ssd = min);
        Some(self.finish(image, &trimmed, (best.0 as i64, best.1 as i64), delta))
    }

    fn match_location_on_line(
        &mut self,
        image: ImageView<'_, u8>,
        search: IntRect,
        line: AxisLine,
        spread: usize,
    ) -> Option<Point> {
        let _span = trace_span!("match_location_on_line").entered();
        let Some(trimmed) = self.trim_search(image, search) else {
            self.score = MatchScore::IMPOSSIBLE;
            return None;
        };
        let Some(window) = self.test_window(image, &trimmed) else {
            self.score = MatchScore::IMPOSSIBLE;
            return None;
        };

        let normal = Point::new(line.angle.sin(), line.angle.cos());
        let spread = spread as i64;
        let mut lanes: Vec<(Vec<Point>, Vec<f64>)> = Vec::new();
        for k in -spread..=spread {
            let shifted = AxisLine {
                origin: Point::new(
                    line.origin.x + k as f64 * normal.x,
                    line.origin.y + k as f64 * normal.y,
                ),
                angle: line.angle,
            };
            if let Some(points) = line_search_points(trimmed.rect, shifted) {
                let diffs = points
                    .iter()
                    .map(|p| masked_ssd_at(window, &self.template, p.x as i64, p.y as i64))
                    .collect();
                lanes.push((points, diffs));
            }
        }
        let count: usize = lanes.iter().map(|(p, _)| p.len()).sum();
        if count == 0 {
            self.score = MatchScore::NO_LINE;
            return None;
        }

        let mut min = f64::INFINITY;
        let mut total = 0.0;
        let mut best: Option<(usize, usize)> = None;
        for (lane, (_, diffs)) in lanes.iter().enumerate() {
            for (i, &d) in diffs.iter().enumerate() {
                total += d;
                if d < min {
                    min = d;
                    best = Some((lane, i));
                }
            }
        }
        let (lane, i) = best?;
        let mean = total / count as f64;
        let peak = mean / min - 1.0;

        let (points, diffs) = &lanes[lane];
        let at = points[i];
        let mut delta = Point::default();
        let mut width = f64::NAN;
        if !peak.is_infinite() && i > 0 && i + 1 < points.len() {
            let (prev, next) = (points[i - 1], points[i + 1]);
            let xs = [-prev.distance(at), 0.0, next.distance(at)];
            let hs = [mean / diffs[i - 1] - 1.0, peak, mean / diffs[i + 1] - 1.0];
            if let Some((dl, w)) = gaussian_peak(xs, hs) {
                let span = prev.distance(next);
                delta = Point::new(dl * (next.x - prev.x) / span, dl * (next.y - prev.y) / span);
                width = w;
            }
        }
        self.score = MatchScore {
            width,
            height: peak,
        };
        Some(self.finish(image, &trimmed, (at.x as i64, at.y as i64), delta))
    }

    fn match_score(&self) -> MatchScore {
        self.score
    }

    fn build_template(
        &mut self,
        image: ImageView<'_, u8>,
        evolve_alpha: u8,
        tether_alpha: u8,
    ) -> Option<&Template> {
        let (w, h) = (self.original.width(), self.original.height());
        if image.width() != w || image.height() != h {
            return None;
        }
        if evolve_alpha == 0 && tether_alpha == 0 {
            return Some(&self.template);
        }
        let _span = trace_span!("build_template").entered();
        self.alphas = (evolve_alpha, tether_alpha);
        if evolve_alpha > 0 {
            blend(&mut self.working, image, evolve_alpha);
        }
        if tether_alpha > 0 {
            blend(&mut self.working, self.original.view(), tether_alpha);
        }
        let pixels = self
            .working
            .iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        let blended = OwnedImage::new(pixels, w, h).ok()?;
        let (template, trim) = trimmed_template(&blended, &self.mask);
        self.template = template;
        self.trim = trim;
        Some(&self.template)
    }

    fn alphas(&self) -> (u8, u8) {
        self.alphas
    }

    fn working_pixels(&self, reuse: Option<Vec<f32>>) -> Vec<f32> {
        let mut buf = reuse.unwrap_or_default();
        buf.clear();
        buf.extend_from_slice(&self.working);
        buf
    }

    fn set_working_pixels(&mut self, pixels: &[f32]) {
        if pixels.len() == self.working.len() {
            self.working.copy_from_slice(pixels);
        }
    }

    fn set_index(&mut self, frame: usize) {
        self.index = frame;
    }

    fn index(&self) -> usize {
        self.index
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn match_image(&self) -> Option<&OwnedImage> {
        self.match_image.as_ref()
    }
}

/// `dst = dst * (1 - a) + src * a` with `a = alpha / 255`.
fn blend(dst: &mut [f32], src: ImageView<'_, u8>, alpha: u8) {
    let a = alpha as f32 / 255.0;
    let width = src.width();
    for y in 0..src.height() {
        let Some(row) = src.row(y) else {
            return;
        };
        for (d, &s) in dst[y * width..(y + 1) * width].iter_mut().zip(row) {
            *d = *d * (1.0 - a) + s as f32 * a;
        }
    }
}

/// Crops `image` to the bounding box of the opaque pixels in `mask`.
fn trimmed_template(image: &OwnedImage, mask: &[bool]) -> (Template, (usize, usize)) {
    let (w, h) = (image.width(), image.height());
    let mut x_range: Option<(usize, usize)> = None;
    let mut y_range: Option<(usize, usize)> = None;
    for y in 0..h {
        for x in 0..w {
            if mask[y * w + x] {
                x_range = Some(x_range.map_or((x, x), |(a, b)| (a.min(x), b.max(x))));
                y_range = Some(y_range.map_or((y, y), |(a, b)| (a.min(y), b.max(y))));
            }
        }
    }
    let (Some((x0, x1)), Some((y0, y1))) = (x_range, y_range) else {
        return (Template::opaque(image.clone()), (0, 0));
    };
    let (tw, th) = (x1 - x0 + 1, y1 - y0 + 1);
    let mut pixels = Vec::with_capacity(tw * th);
    let mut inside = Vec::with_capacity(tw * th);
    for y in y0..=y1 {
        let base = y * w;
        pixels.extend_from_slice(&image.data()[base + x0..=base + x1]);
        inside.extend_from_slice(&mask[base + x0..=base + x1]);
    }
    match OwnedImage::new(pixels, tw, th).and_then(|img| Template::new(img, inside)) {
        Ok(t) => (t, (x0, y0)),
        Err(_) => (Template::opaque(image.clone()), (0, 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::SsdMatcher;
    use crate::geom::{IntRect, Point};
    use crate::image::OwnedImage;
    use crate::matcher::{AxisLine, Matcher};
    use crate::template::Template;

    fn scene() -> OwnedImage {
        OwnedImage::from_fn(40, 30, |x, y| ((x * 37 + y * 91 + x * y * 7) % 251) as u8).unwrap()
    }

    fn patch_at(img: &OwnedImage, x: usize, y: usize, w: usize, h: usize) -> Template {
        let crop = crate::image::sample_region(img.view(), x as i64, y as i64, w, h, 0).unwrap();
        Template::opaque(crop)
    }

    #[test]
    fn new_matcher_template_equals_patch() {
        let img = scene();
        let patch = patch_at(&img, 5, 6, 5, 4);
        let m = SsdMatcher::new(patch.clone());
        assert_eq!(m.template(), &patch);
        assert_eq!(m.alphas(), (255, 0));
    }

    #[test]
    fn exact_match_has_infinite_quality() {
        let img = scene();
        let mut m = SsdMatcher::new(patch_at(&img, 12, 9, 5, 5));
        let loc = m
            .match_location(img.view(), IntRect::new(5, 5, 20, 15))
            .unwrap();
        assert_eq!(loc, Point::new(12.0, 9.0));
        assert!(m.match_score().quality().is_infinite());
        assert!(m.match_image().is_some());
    }

    #[test]
    fn masked_corners_are_trimmed_and_restored() {
        let img = scene();
        let crop = crate::image::sample_region(img.view(), 10, 8, 6, 6, 0).unwrap();
        let mut mask = vec![false; 36];
        for y in 1..5 {
            for x in 2..5 {
                mask[y * 6 + x] = true;
            }
        }
        let mut m = SsdMatcher::new(Template::new(crop, mask).unwrap());
        assert_eq!(m.trim(), (2, 1));
        assert_eq!((m.template().width(), m.template().height()), (3, 4));
        let loc = m
            .match_location(img.view(), IntRect::new(4, 4, 20, 16))
            .unwrap();
        assert_eq!(loc, Point::new(10.0, 8.0));
    }

    #[test]
    fn search_outside_image_is_impossible() {
        let img = scene();
        let mut m = SsdMatcher::new(patch_at(&img, 2, 2, 5, 5));
        assert!(m
            .match_location(img.view(), IntRect::new(60, 60, 10, 10))
            .is_none());
        assert!(m.match_score().is_impossible());
        assert!(m.match_score().width.is_nan());
    }

    #[test]
    fn line_search_missing_rect_reports_negative_width() {
        let img = scene();
        let mut m = SsdMatcher::new(patch_at(&img, 2, 2, 5, 5));
        let line = AxisLine {
            origin: Point::new(0.0, 1.0),
            angle: 0.0,
        };
        assert!(m
            .match_location_on_line(img.view(), IntRect::new(10, 10, 10, 10), line, 0)
            .is_none());
        assert_eq!(m.match_score().width, -1.0);
        assert!(m.match_score().height.is_nan());
    }

    #[test]
    fn line_search_finds_feature_on_axis() {
        let img = scene();
        let mut m = SsdMatcher::new(patch_at(&img, 14, 10, 5, 5));
        // Template centre is (16, 12); the axis runs through it.
        let line = AxisLine {
            origin: Point::new(0.0, 12.5),
            angle: 0.0,
        };
        let loc = m
            .match_location_on_line(img.view(), IntRect::new(4, 6, 26, 12), line, 1)
            .unwrap();
        assert_eq!(loc, Point::new(14.0, 10.0));
        assert!(m.match_score().quality().is_infinite());
    }

    #[test]
    fn build_template_blends_toward_input() {
        let bright = Template::opaque(OwnedImage::filled(3, 3, 200).unwrap());
        let mut m = SsdMatcher::new(bright);
        let dark = OwnedImage::filled(3, 3, 0).unwrap();
        let tpl = m.build_template(dark.view(), 51, 0).unwrap();
        assert!(tpl.image().data().iter().all(|&v| v == 160));
        assert_eq!(m.alphas(), (51, 0));

        let tpl = m.build_template(dark.view(), 0, 255).unwrap();
        assert!(tpl.image().data().iter().all(|&v| v == 200));
    }

    #[test]
    fn zero_alphas_keep_current_template() {
        let mut m = SsdMatcher::new(Template::opaque(OwnedImage::filled(2, 2, 9).unwrap()));
        let other = OwnedImage::filled(2, 2, 0).unwrap();
        let before = m.template().clone();
        assert_eq!(m.build_template(other.view(), 0, 0), Some(&before));
        assert_eq!(m.alphas(), (255, 0));
    }

    #[test]
    fn working_pixels_round_trip() {
        let mut m = SsdMatcher::new(Template::opaque(OwnedImage::filled(2, 2, 9).unwrap()));
        let saved = m.working_pixels(None);
        let other = OwnedImage::filled(2, 2, 0).unwrap();
        m.build_template(other.view(), 255, 0);
        m.set_working_pixels(&saved);
        assert_eq!(m.working_pixels(Some(Vec::new())), vec![9.0; 4]);
    }

    #[test]
    fn matcher_ids_are_unique() {
        let a = SsdMatcher::new(Template::opaque(OwnedImage::filled(2, 2, 1).unwrap()));
        let b = SsdMatcher::new(Template::opaque(OwnedImage::filled(2, 2, 1).unwrap()));
        assert_ne!(a.id(), b.id());
    }
}
