//! In-memory track and frame sequence, for tests and batch runs.

use std::collections::BTreeMap;

use super::host::{Step, Track, TrackKind, VideoSource};
use crate::geom::Point;
use crate::image::{ImageView, OwnedImage};
use crate::matcher::AxisLine;
use crate::store::TrackId;
use crate::util::{AutoTrackError, AutoTrackResult};

/// A track whose steps live in a map keyed by frame.
#[derive(Clone, Debug)]
pub struct PointTrack {
    id: TrackId,
    kind: TrackKind,
    point_count: usize,
    target_index: usize,
    autofill: bool,
    steps: BTreeMap<usize, Step>,
    derivative_updates: usize,
}

impl PointTrack {
    /// Single-point track.
    pub fn new(id: TrackId, kind: TrackKind) -> Self {
        Self::with_points(id, kind, 1)
    }

    pub fn with_points(id: TrackId, kind: TrackKind, point_count: usize) -> Self {
        Self {
            id,
            kind,
            point_count: point_count.max(1),
            target_index: 0,
            autofill: false,
            steps: BTreeMap::new(),
            derivative_updates: 0,
        }
    }

    pub fn with_autofill(mut self, autofill: bool) -> Self {
        self.autofill = autofill;
        self
    }

    /// Marks point `index` on `frame` by hand.
    pub fn mark(&mut self, frame: usize, index: usize, point: Point) {
        let count = self.point_count;
        let step = self.steps.entry(frame).or_insert_with(|| Step::new(count));
        if let Some(slot) = step.points.get_mut(index) {
            *slot = Some(point);
        }
    }

    /// How many times derivatives were recomputed.
    pub fn derivative_updates(&self) -> usize {
        self.derivative_updates
    }
}

impl Track for PointTrack {
    fn id(&self) -> TrackId {
        self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_autofill(&self) -> bool {
        self.autofill
    }

    fn target_index(&self) -> usize {
        self.target_index
    }

    fn set_target_index(&mut self, index: usize) {
        if index < self.point_count {
            self.target_index = index;
        }
    }

    fn step(&self, frame: usize) -> Option<&Step> {
        self.steps.get(&frame)
    }

    fn auto_mark_at(&mut self, frame: usize, point: Point) -> Point {
        self.mark(frame, self.target_index, point);
        point
    }

    fn delete_step(&mut self, frame: usize) {
        self.steps.remove(&frame);
    }

    fn marked_frames(&self) -> Vec<usize> {
        self.steps.keys().copied().collect()
    }

    fn update_derivatives(&mut self) {
        self.derivative_updates += 1;
    }
}

/// Decoded grayscale frames played forward one at a time.
#[derive(Clone, Debug)]
pub struct FrameSequence {
    frames: Vec<OwnedImage>,
    current: usize,
    axes: AxisLine,
}

impl FrameSequence {
    /// Sequence positioned on frame 0. Every frame must share one size.
    pub fn new(frames: Vec<OwnedImage>) -> AutoTrackResult<Self> {
        let first = frames.first().ok_or(AutoTrackError::InvalidDimensions {
            width: 0,
            height: 0,
        })?;
        let (w, h) = (first.width(), first.height());
        if let Some(bad) = frames.iter().find(|f| f.width() != w || f.height() != h) {
            return Err(AutoTrackError::InvalidDimensions {
                width: bad.width(),
                height: bad.height(),
            });
        }
        Ok(Self {
            frames,
            current: 0,
            axes: AxisLine::default(),
        })
    }

    /// Uses `axes` as the coordinate system's x axis on every frame.
    pub fn with_axes(mut self, axes: AxisLine) -> Self {
        self.axes = axes;
        self
    }

    pub fn frames(&self) -> &[OwnedImage] {
        &self.frames
    }
}

impl VideoSource for FrameSequence {
    fn frame_number(&self) -> usize {
        self.current
    }

    fn set_frame_number(&mut self, frame: usize) {
        self.current = frame.min(self.frames.len().saturating_sub(1));
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn current_image(&self) -> Option<ImageView<'_, u8>> {
        self.frames.get(self.current).map(OwnedImage::view)
    }

    fn frame_image(&self, frame: usize) -> Option<ImageView<'_, u8>> {
        self.frames.get(frame).map(OwnedImage::view)
    }

    fn axes(&self, _frame: usize) -> AxisLine {
        self.axes
    }
}
