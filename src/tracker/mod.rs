//! The tracking controller.
//!
//! [`AutoTracker`] owns the video, the active track and the frame cache. A run
//! is started with [`AutoTracker::search`]; each time the tracker advances the
//! video it leaves the new frame pending, and the host processes it with one
//! call to [`AutoTracker::tick`]. Hosts interleave other work between ticks and
//! cancel a run with [`AutoTracker::stop`] at any time.

use crate::classify::{classify, FrameFacts, StatusCode};
use crate::geom::{IntRect, Point};
use crate::image::{sample_region, ImageView};
use crate::matcher::{Matcher, MatcherFactory};
use crate::options::AutoTrackOptions;
use crate::predict::{self, LOOKBACK};
use crate::search::SearchRegion;
use crate::store::{FrameData, FrameDataStore, FrameRecord, KeyFrameData, MatchPoints, TrackId};
use crate::template::{EllipseMask, Template, TemplateManager, CORNER_FACTOR};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::AutoTrackResult;

pub mod host;
pub mod memory;

pub use host::{Step, Track, TrackKind, VideoSource};
pub use memory::{FrameSequence, PointTrack};

/// Externally visible controller state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    /// Searching and stepping through frames.
    Searching,
    /// Searching one frame, then stopping.
    SingleShot,
    /// A frame could not be marked; waiting for the user.
    Paused,
}

/// Result of one [`AutoTracker::tick`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No frame change was pending.
    NoWork,
    /// The frame was processed and the next one is pending.
    Advanced,
    /// The frame could not be marked and the run is paused.
    Paused,
    /// The run ended.
    Stopped,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum RunState {
    Idle,
    Active,
    Paused,
}

/// Template-matching auto-tracker for one active track at a time.
pub struct AutoTracker<V, T, F>
where
    F: MatcherFactory,
{
    options: AutoTrackOptions,
    video: V,
    track: Option<T>,
    factory: F,
    store: FrameDataStore<F::Matcher>,
    region: SearchRegion,
    templates: TemplateManager,
    run: RunState,
    stepping: bool,
    step_pending: bool,
    autoskips_remaining: u32,
}

impl<V, T, F> AutoTracker<V, T, F>
where
    V: VideoSource,
    T: Track,
    F: MatcherFactory,
{
    /// Creates an idle tracker with no track.
    pub fn new(video: V, factory: F, options: AutoTrackOptions) -> AutoTrackResult<Self> {
        options.validate()?;
        Ok(Self {
            templates: TemplateManager::new(options.evolve_alpha, options.tether_alpha),
            options,
            video,
            track: None,
            factory,
            store: FrameDataStore::new(),
            region: SearchRegion::default(),
            run: RunState::Idle,
            stepping: false,
            step_pending: false,
            autoskips_remaining: 0,
        })
    }

    pub fn options(&self) -> &AutoTrackOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: AutoTrackOptions) -> AutoTrackResult<()> {
        options.validate()?;
        self.templates = TemplateManager::new(options.evolve_alpha, options.tether_alpha);
        self.options = options;
        Ok(())
    }

    pub fn video(&self) -> &V {
        &self.video
    }

    pub fn video_mut(&mut self) -> &mut V {
        &mut self.video
    }

    pub fn track(&self) -> Option<&T> {
        self.track.as_ref()
    }

    pub fn track_mut(&mut self) -> Option<&mut T> {
        self.track.as_mut()
    }

    /// Makes `track` the active track and returns the previous one.
    ///
    /// Tracks that are not auto-trackable are handed back as the error.
    pub fn set_track(&mut self, track: T) -> Result<Option<T>, T> {
        if !track.is_auto_trackable() {
            return Err(track);
        }
        self.stop(true, false);
        let previous = self.track.replace(track);
        self.restore_search_points();
        Ok(previous)
    }

    /// Detaches the active track, keeping its cached frames.
    pub fn take_track(&mut self) -> Option<T> {
        self.stop(true, false);
        self.track.take()
    }

    pub fn store(&self) -> &FrameDataStore<F::Matcher> {
        &self.store
    }

    /// Cached record of `frame` for the active track point.
    pub fn frame_data(&self, frame: usize) -> Option<&FrameData> {
        let (id, index) = self.bucket_key()?;
        self.store
            .bucket(id, index)?
            .get(frame)
            .map(FrameRecord::data)
    }

    pub fn search_region(&self) -> &SearchRegion {
        &self.region
    }

    /// Pixel rectangle the next search will scan.
    pub fn search_rect(&self) -> IntRect {
        self.region.bounds()
    }

    pub fn state(&self) -> TrackerState {
        match self.run {
            RunState::Idle => TrackerState::Idle,
            RunState::Paused => TrackerState::Paused,
            RunState::Active if self.stepping => TrackerState::Searching,
            RunState::Active => TrackerState::SingleShot,
        }
    }

    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    /// True when a frame change is waiting for [`AutoTracker::tick`].
    pub fn has_pending_step(&self) -> bool {
        self.step_pending
    }

    fn bucket_key(&self) -> Option<(TrackId, usize)> {
        self.track.as_ref().map(|t| (t.id(), t.target_index()))
    }

    /// Defines a key frame on the current frame.
    ///
    /// `target` is marked on the track; the mask and search rectangle are
    /// centred on `mask_center` with the default sizes.
    pub fn add_key_frame(&mut self, target: Point, mask_center: Point) -> bool {
        let Some((id, index)) = self.bucket_key() else {
            return false;
        };
        if self.video.image_size().is_none() {
            return false;
        }
        let n = self.video.frame_number();
        let _span = trace_span!("add_key_frame", frame = n).entered();

        let (mw, mh) = self.options.mask_size;
        let (sw, sh) = self.options.search_size;
        let mask_corner = mask_center + Point::new(mw, mh);
        let key = KeyFrameData::new(mask_center, mask_corner, self.options.min_mask_radius);
        self.store.bucket_mut(id, index).insert_key_frame(n, key);
        if let Some(track) = self.track.as_mut() {
            track.auto_mark_at(n, target);
        }
        self.store.clear_from(id, index, n);
        self.set_search_region(mask_center, Some(mask_center + Point::new(sw, sh)));
        trace_event!("key_frame_added", frame = n, index = index);
        self.refresh_key_frame(n);
        true
    }

    /// Rebuilds the key frame's mask and matcher and re-anchors its target.
    fn refresh_key_frame(&mut self, n: usize) {
        let Some((id, index)) = self.bucket_key() else {
            return;
        };
        let marked = self.track.as_ref().and_then(|t| t.marked_point(n, index));
        let min_radius = self.options.min_mask_radius;
        let Some(image) = self.video.current_image() else {
            return;
        };
        let Some(FrameRecord::Key(data, key)) = self.store.bucket_mut(id, index).get_mut(n) else {
            return;
        };
        let (center, corner) = (key.mask_center, key.mask_corner);
        key.set_mask_points(center, corner, min_radius);
        key.matcher = build_matcher(&mut self.factory, image, &key.mask);
        data.template = None;
        data.matcher_id = None;
        if let Some(p) = marked {
            key.target_offset = p - center;
        }
        if let (Some(p), Some(track)) = (marked, self.track.as_mut()) {
            data.auto_mark = Some(track.auto_mark_at(n, p));
        }
        self.search(true, false);
    }

    /// Starts searching.
    ///
    /// With `start_with_this` the current frame is searched first; with
    /// `keep_going` the tracker keeps stepping until it pauses or the clip ends.
    pub fn search(&mut self, start_with_this: bool, keep_going: bool) {
        self.stepping = self.stepping || keep_going;
        self.run = RunState::Active;
        if !start_with_this || self.mark_current_frame(false) || self.options.never_pause {
            if self.video.can_step() && (!start_with_this || self.stepping) {
                self.advance();
                return;
            }
            if start_with_this && !self.stepping {
                self.run = RunState::Idle;
            } else {
                self.stop(true, true);
            }
        } else {
            self.run = RunState::Paused;
            trace_event!("search_paused", frame = self.video.frame_number());
        }
    }

    /// Stops the run now, or after the current step when `now` is false.
    pub fn stop(&mut self, now: bool, update: bool) {
        self.stepping = false;
        self.run = if now || self.run == RunState::Paused {
            RunState::Idle
        } else {
            RunState::Active
        };
        if update {
            self.refresh_derivatives();
        }
    }

    /// Processes a pending frame change: one step of the run.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.step_pending {
            return TickOutcome::NoWork;
        }
        self.step_pending = false;
        self.on_frame_changed();
        if self.step_pending {
            TickOutcome::Advanced
        } else if self.run == RunState::Paused {
            TickOutcome::Paused
        } else {
            TickOutcome::Stopped
        }
    }

    /// Ticks until the run stops, pauses, or `max_ticks` ticks have run.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> TickOutcome {
        let mut outcome = TickOutcome::NoWork;
        for _ in 0..max_ticks {
            outcome = self.tick();
            if outcome != TickOutcome::Advanced {
                break;
            }
        }
        outcome
    }

    /// Moves the video to `frame` as a user would.
    ///
    /// An unpaused run continues from the new frame; a paused multi-frame run stops.
    pub fn set_frame(&mut self, frame: usize) {
        self.video.set_frame_number(frame);
        self.step_pending = false;
        self.on_frame_changed();
    }

    fn advance(&mut self) {
        self.video.step();
        self.step_pending = true;
    }

    fn unpause(&mut self) {
        if self.run == RunState::Paused {
            self.run = RunState::Active;
        }
    }

    fn refresh_derivatives(&mut self) {
        if let Some(track) = self.track.as_mut() {
            if track.kind() == TrackKind::PointMass {
                track.update_derivatives();
            }
        }
    }

    fn on_frame_changed(&mut self) {
        let Some((id, index)) = self.bucket_key() else {
            return;
        };
        let n = self.video.frame_number();
        if !self.restore_search_points() && self.options.look_ahead {
            let offset = self.store.bucket(id, index).and_then(|b| b.target_offset(n));
            if let (Some(offset), Some(target)) = (offset, self.get_predicted_match_target(n)) {
                self.set_search_region(target - offset, None);
            }
        }
        match self.run {
            RunState::Active => self.step_current_frame(),
            _ if self.stepping => self.stop(true, false),
            _ => {}
        }
    }

    /// Moves the search region to the current frame's inherited points.
    fn restore_search_points(&mut self) -> bool {
        let Some((id, index)) = self.bucket_key() else {
            return false;
        };
        let n = self.video.frame_number();
        let points = self
            .store
            .bucket(id, index)
            .and_then(|b| b.inherited_search_points(n));
        match points {
            Some(points) => {
                self.set_search_region(points.center, Some(points.corner));
                true
            }
            None => false,
        }
    }

    fn step_current_frame(&mut self) {
        if self.run != RunState::Active || self.track.is_none() {
            return;
        }
        let move_region = !self.options.never_pause;
        if self.mark_current_frame(move_region) || self.options.never_pause {
            if !self.video.can_step() {
                trace_event!("end_of_clip", frame = self.video.frame_number());
                self.stop(true, true);
            } else if self.stepping {
                self.advance();
            } else {
                self.stop(true, true);
            }
        } else if !self.stepping {
            self.stop(true, false);
        } else {
            self.run = RunState::Paused;
            trace_event!("search_paused", frame = self.video.frame_number());
            self.refresh_derivatives();
        }
    }

    /// Searches the current frame and marks it when the match is good.
    ///
    /// Returns true when the frame was marked, was already fully marked, or
    /// was skipped from the auto-skip budget.
    pub fn mark_current_frame(&mut self, predict: bool) -> bool {
        let Some((id, index)) = self.bucket_key() else {
            return false;
        };
        let n = self.video.frame_number();
        if self.store.nearest_key_frame(id, index, n).is_none() {
            return false;
        }
        if self.track.as_ref().is_some_and(|t| t.is_step_complete(n)) {
            return true;
        }

        let target = self.find_match_target(predict);
        if let Some(p) = target {
            let Some(track) = self.track.as_mut() else {
                return false;
            };
            let mark = track.auto_mark_at(n, p);
            self.store.get_or_create(id, index, n).data_mut().auto_mark = Some(mark);
            self.autoskips_remaining = self.options.auto_skip_count;
            trace_event!("auto_marked", frame = n, x = mark.x, y = mark.y);
            return true;
        }

        let record = self.store.get_or_create(id, index, n);
        let quality = record.data().quality().unwrap_or(f64::NAN);
        if quality.is_nan() || quality < self.options.possible_match {
            if self.autoskips_remaining > 0 {
                self.autoskips_remaining -= 1;
                trace_event!("auto_skipped", frame = n, remaining = self.autoskips_remaining);
                return true;
            }
            record.data_mut().match_image = None;
        }
        false
    }

    /// Predicted target position on `frame` from the marks before it.
    pub fn get_predicted_match_target(&self, frame: usize) -> Option<Point> {
        let track = self.track.as_ref()?;
        let index = track.target_index();
        let (w, h) = self.video.image_size()?;
        let bucket = self.store.bucket(track.id(), index);

        let mut prior = [None; LOOKBACK];
        for (j, slot) in prior.iter_mut().enumerate() {
            let Some(n) = frame.checked_sub(j + 1) else {
                break;
            };
            let data = bucket.and_then(|b| b.get(n)).map(FrameRecord::data);
            let searched = data.is_some_and(|d| d.searched);
            if track.is_autofill() && !searched {
                continue;
            }
            *slot = track.marked_point(n, index).or_else(|| {
                let data = data.filter(|d| d.searched)?;
                let center = data.match_points?.center;
                Some(center + bucket?.target_offset(n)?)
            });
        }
        predict::predict(&prior, self.options.look_ahead, w, h)
    }

    /// Searches the current frame, optionally moving the region to the
    /// predicted target first. Returns the target of a good match.
    pub fn find_match_target(&mut self, predict: bool) -> Option<Point> {
        let (id, index) = self.bucket_key()?;
        let n = self.video.frame_number();
        if predict {
            let offset = self.store.bucket(id, index).and_then(|b| b.target_offset(n));
            if let (Some(offset), Some(target)) = (offset, self.get_predicted_match_target(n)) {
                self.set_search_region(target - offset, None);
            }
        }
        self.save_search_points();
        self.find_match_target_in(self.region.bounds())
    }

    /// Searches `search` on the current frame and caches the outcome.
    ///
    /// Possible matches are recorded but only a good match returns its target;
    /// a good match also evolves the template.
    pub fn find_match_target_in(&mut self, search: IntRect) -> Option<Point> {
        let (id, index) = self.bucket_key()?;
        let n = self.video.frame_number();
        let marked = self.track.as_ref().and_then(|t| t.marked_point(n, index));
        let image = self.video.current_image()?;
        let _span = trace_span!("find_match_target", frame = n).entered();

        let bucket = self.store.bucket_mut(id, index);
        let key = bucket.nearest_key_frame(n)?;
        let (mask_center, mask_corner) = (key.mask_center, key.mask_corner);
        let (mask, offset) = (key.mask, key.target_offset);
        let bounds = mask.bounds();
        let (key_n, mut matcher) = match bucket.take_matcher(n) {
            Some(taken) => taken,
            None => {
                let key_n = bucket.nearest_key_frame_number(n)?;
                let key_image = self.video.frame_image(key_n);
                trace_event!(
                    "matcher_rebuilt",
                    frame = n,
                    key_frame = key_n,
                    from_key_image = key_image.is_some()
                );
                (key_n, build_matcher(&mut self.factory, key_image.unwrap_or(image), &mask)?)
            }
        };

        let record = bucket.get_or_create(n);
        let is_key = record.is_key_frame();
        let frame = record.data_mut();
        frame.decided = false;
        if let Some(template) = TemplateManager::current_template(frame, is_key, &matcher) {
            matcher.set_template(template);
        }

        let location = match self.options.line_spread {
            Some(spread) => {
                matcher.match_location_on_line(image, search, self.video.axes(n), spread)
            }
            None => matcher.match_location(image, search),
        };
        let score = matcher.match_score();
        let quality = score.quality();
        if quality < self.options.good_match && frame.is_auto_marked(marked) {
            frame.auto_mark = None;
        }
        frame.match_score = Some(score);
        frame.searched = !score.is_impossible();
        trace_debug!("match_scored", frame = n, quality = quality);

        let target = match location {
            Some(p) if quality.is_nan() || quality >= self.options.possible_match => {
                frame.match_image = matcher.match_image().cloned();
                let center = Point::new(
                    p.x + mask_center.x - bounds.x as f64,
                    p.y + mask_center.y - bounds.y as f64,
                );
                let corner = Point::new(
                    center.x + CORNER_FACTOR * (mask_corner.x - mask_center.x),
                    center.y + CORNER_FACTOR * (mask_corner.y - mask_center.y),
                );
                frame.match_points = Some(MatchPoints {
                    center,
                    corner,
                    location: p,
                });
                if quality >= self.options.good_match {
                    self.templates.evolve(frame, &mut matcher, image, bounds);
                    Some(center + offset)
                } else {
                    None
                }
            }
            _ => {
                frame.match_points = None;
                None
            }
        };
        bucket.put_matcher(key_n, matcher);
        target
    }

    /// Status code of `frame` for the active track point.
    pub fn status_code(&self, frame: usize) -> StatusCode {
        let Some(track) = self.track.as_ref() else {
            return StatusCode::NeverSearched;
        };
        let index = track.target_index();
        let record = self
            .store
            .bucket(track.id(), index)
            .and_then(|b| b.get(frame));
        let is_key_frame = record.is_some_and(FrameRecord::is_key_frame);
        let data = record.map(FrameRecord::data);
        let facts = FrameFacts {
            is_key_frame,
            marked: track.step(frame).is_some(),
            auto_marked: data.is_some_and(|d| d.is_auto_marked(track.marked_point(frame, index))),
            calibration_tool: track.kind().is_calibration_tool(),
            searched: data.is_some_and(|d| d.searched),
            decided: data.is_some_and(|d| d.decided),
            quality: data.and_then(FrameData::quality),
        };
        classify(&facts, self.options.thresholds())
    }

    /// True when `frame` is a key frame of the active track point.
    pub fn is_on_key_frame(&self, frame: usize) -> bool {
        self.bucket_key()
            .and_then(|(id, index)| self.store.bucket(id, index))
            .is_some_and(|b| b.is_key_frame(frame))
    }

    /// Key-frame numbers of the active track point.
    pub fn key_frames(&self) -> Vec<usize> {
        self.bucket_key()
            .and_then(|(id, index)| self.store.bucket(id, index))
            .map(|b| b.key_frames())
            .unwrap_or_default()
    }

    /// Forgets all cached frames of the active track point and its marks.
    ///
    /// Always-marked tracks keep their steps. The video returns to the first
    /// key frame there was.
    pub fn reset(&mut self) {
        let Some((id, index)) = self.bucket_key() else {
            return;
        };
        let first_key = self.store.bucket_mut(id, index).clear();
        if let Some(track) = self.track.as_mut() {
            if !track.is_always_marked() {
                for frame in track.marked_frames() {
                    track.delete_step(frame);
                }
            }
        }
        self.stop(true, true);
        trace_event!("reset", index = index);
        if let Some(frame) = first_key {
            self.set_frame(frame);
        }
    }

    /// Clears the match results cached for `frame`.
    pub fn delete(&mut self, frame: usize) {
        if let Some((id, index)) = self.bucket_key() {
            self.store.get_or_create(id, index, frame).clear();
        }
    }

    /// Deletes `frame`'s record and, unless always marked, its step.
    ///
    /// Key-frame records are cleared instead of removed.
    pub fn delete_frame(&mut self, frame: usize) {
        let Some((id, index)) = self.bucket_key() else {
            return;
        };
        let bucket = self.store.bucket_mut(id, index);
        if bucket.is_key_frame(frame) {
            if let Some(record) = bucket.get_mut(frame) {
                record.clear();
            }
        } else {
            bucket.remove(frame);
        }
        if let Some(track) = self.track.as_mut() {
            if !track.is_always_marked() {
                track.delete_step(frame);
            }
        }
    }

    /// Deletes every record after `frame` and, unless always marked, the later steps.
    pub fn delete_later(&mut self, frame: usize) {
        let Some((id, index)) = self.bucket_key() else {
            return;
        };
        self.store.bucket_mut(id, index).remove_after(frame);
        if let Some(track) = self.track.as_mut() {
            if !track.is_always_marked() {
                for later in track.marked_frames().into_iter().filter(|&f| f > frame) {
                    track.delete_step(later);
                }
            }
        }
    }

    /// Turns the key frame at `frame` back into a plain frame.
    ///
    /// When no earlier key frame remains, every record up to the next key
    /// frame is dropped. Returns false when `frame` is not a key frame.
    pub fn delete_key_frame(&mut self, frame: usize) -> bool {
        let Some((id, index)) = self.bucket_key() else {
            return false;
        };
        let bucket = self.store.bucket_mut(id, index);
        let next_key = bucket.next_key_frame_after(frame);
        if bucket.demote_key_frame(frame).is_none() {
            return false;
        }
        if bucket.nearest_key_frame_number(frame).is_none() {
            bucket.remove_before(next_key);
        }
        let Some(track) = self.track.as_ref() else {
            return true;
        };
        if track.step(frame).is_none() {
            if let Some(record) = bucket.get_mut(frame) {
                let data = record.data_mut();
                data.template = None;
                data.search_points = None;
            }
            let later: Vec<usize> = bucket
                .frames()
                .filter(|(n, r)| *n > frame && !r.is_key_frame() && track.step(*n).is_none())
                .map(|(n, _)| n)
                .collect();
            for n in later {
                if let Some(record) = bucket.get_mut(n) {
                    record.clear();
                }
            }
        }
        trace_event!("key_frame_deleted", frame = frame);
        true
    }

    /// Accepts the possible match on the current frame: evolves the template,
    /// marks the target and continues the run.
    pub fn accept(&mut self) -> bool {
        let Some((id, index)) = self.bucket_key() else {
            return false;
        };
        let n = self.video.frame_number();
        let Some(image) = self.video.current_image() else {
            return false;
        };
        let bucket = self.store.bucket_mut(id, index);
        let Some(key) = bucket.nearest_key_frame(n) else {
            return false;
        };
        let (offset, bounds) = (key.target_offset, key.mask.bounds());
        let Some(center) = bucket
            .get(n)
            .and_then(|r| r.data().match_points)
            .map(|p| p.center)
        else {
            return false;
        };
        if let Some((key_n, mut matcher)) = bucket.take_matcher(n) {
            if let Some(record) = bucket.get(n) {
                self.templates
                    .evolve(record.data(), &mut matcher, image, bounds);
            }
            bucket.put_matcher(key_n, matcher);
        } else {
            trace_event!("evolve_skipped", frame = n);
        }

        let Some(track) = self.track.as_mut() else {
            return false;
        };
        let mark = track.auto_mark_at(n, center + offset);
        let data = self.store.get_or_create(id, index, n).data_mut();
        data.auto_mark = Some(mark);
        data.decided = true;
        trace_event!("match_accepted", frame = n);
        self.continue_or_stop(true);
        true
    }

    /// Leaves the current frame unmarked and continues the run.
    pub fn skip(&mut self) {
        let Some((id, index)) = self.bucket_key() else {
            return;
        };
        let n = self.video.frame_number();
        self.store.get_or_create(id, index, n).data_mut().decided = true;
        trace_event!("frame_skipped", frame = n);
        self.continue_or_stop(false);
    }

    fn continue_or_stop(&mut self, accepted: bool) {
        let can_continue = self.video.can_step() && (self.stepping || !accepted);
        if can_continue {
            self.unpause();
            self.advance();
        } else {
            self.stop(true, accepted);
        }
    }

    /// Notifies the tracker that the user marked, moved or deleted the step on `frame`.
    pub fn user_edited_step(&mut self, frame: usize) {
        let Some((id, index)) = self.bucket_key() else {
            return;
        };
        let has_step = self.track.as_ref().is_some_and(|t| t.step(frame).is_some());
        let record = self.store.get_or_create(id, index, frame);
        record.data_mut().decided = true;
        if !has_step {
            record.clear();
        } else if !record.is_key_frame() {
            record.data_mut().match_image = None;
            self.unpause();
        }
    }

    /// Switches the active track point and restores its search region.
    pub fn set_target_index(&mut self, index: usize) {
        let Some(track) = self.track.as_mut() else {
            return;
        };
        if track.target_index() == index {
            return;
        }
        track.set_target_index(index);
        self.restore_search_points();
    }

    /// Moves the current key frame's mask, keeping its size.
    pub fn move_mask(&mut self, center: Point) -> bool {
        self.edit_key_frame(|key| {
            let delta = center - key.mask_center;
            (center, key.mask_corner + delta)
        })
    }

    /// Resizes the current key frame's mask by moving its corner handle.
    pub fn set_mask_corner(&mut self, corner: Point) -> bool {
        self.edit_key_frame(|key| (key.mask_center, corner))
    }

    fn edit_key_frame(&mut self, handles: impl FnOnce(&KeyFrameData<F::Matcher>) -> (Point, Point)) -> bool {
        let Some((id, index)) = self.bucket_key() else {
            return false;
        };
        let n = self.video.frame_number();
        let min_radius = self.options.min_mask_radius;
        let Some(key) = self
            .store
            .bucket_mut(id, index)
            .get_mut(n)
            .and_then(FrameRecord::key_mut)
        else {
            return false;
        };
        let (center, corner) = handles(key);
        key.set_mask_points(center, corner, min_radius);
        self.refresh_key_frame(n);
        self.store.clear_from(id, index, n);
        true
    }

    /// Moves the target on the current key frame and marks it there.
    pub fn set_target(&mut self, point: Point) -> bool {
        let Some((id, index)) = self.bucket_key() else {
            return false;
        };
        let n = self.video.frame_number();
        let Some(FrameRecord::Key(data, key)) = self.store.bucket_mut(id, index).get_mut(n) else {
            return false;
        };
        key.target_offset = point - key.mask_center;
        if let Some(track) = self.track.as_mut() {
            data.auto_mark = Some(track.auto_mark_at(n, point));
        }
        self.store.clear_from(id, index, n);
        true
    }

    /// Moves (`corner` is `None`) or redefines the search region by hand.
    pub fn set_search_points(&mut self, center: Point, corner: Option<Point>) {
        self.set_search_region(center, corner);
        if let Some((id, index)) = self.bucket_key() {
            self.store
                .clear_from(id, index, self.video.frame_number());
        }
    }

    fn set_search_region(&mut self, center: Point, corner: Option<Point>) {
        let Some((w, h)) = self.video.image_size() else {
            return;
        };
        self.region.set_points(center, corner, w, h);
        self.save_search_points();
    }

    fn save_search_points(&mut self) {
        let Some((id, index)) = self.bucket_key() else {
            return;
        };
        let n = self.video.frame_number();
        self.store.get_or_create(id, index, n).data_mut().search_points = Some(self.region.points());
    }

    /// Discards everything cached for track `id`. Returns the track if it was active.
    pub fn remove_track(&mut self, id: TrackId) -> Option<T> {
        self.store.remove_track(id);
        if self.track.as_ref().is_some_and(|t| t.id() == id) {
            return self.take_track();
        }
        None
    }

    /// Discards every cached frame and detaches the active track.
    pub fn clear_tracks(&mut self) -> Option<T> {
        self.store.clear();
        self.take_track()
    }
}

/// Builds a key frame's matcher from the masked patch of `image`.
fn build_matcher<F: MatcherFactory>(
    factory: &mut F,
    image: ImageView<'_, u8>,
    mask: &EllipseMask,
) -> Option<F::Matcher> {
    let b = mask.bounds();
    if b.width <= 0 || b.height <= 0 {
        return None;
    }
    let patch = sample_region(image, b.x, b.y, b.width as usize, b.height as usize, 0).ok()?;
    let template = Template::new(patch, mask.pixel_mask()).ok()?;
    Some(factory.create(template))
}
