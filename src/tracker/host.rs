//! Collaborators the tracker drives: the track being marked and the video.

use crate::geom::Point;
use crate::image::ImageView;
use crate::matcher::AxisLine;
use crate::store::TrackId;

/// Marks of a track on one frame, one slot per track point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Step {
    pub points: Vec<Option<Point>>,
}

impl Step {
    pub fn new(point_count: usize) -> Self {
        Self {
            points: vec![None; point_count],
        }
    }

    pub fn point(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied().flatten()
    }

    /// True when every point of the step is marked.
    pub fn is_complete(&self) -> bool {
        self.points.iter().all(Option::is_some)
    }
}

/// What a track represents, as far as the tracker cares.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrackKind {
    /// A moving object.
    PointMass,
    /// The coordinate axes.
    CoordAxes,
    /// An offset origin.
    OffsetOrigin,
    /// A pair of calibration points.
    Calibration,
    /// A tape measure; `read_only` tapes only measure and do not calibrate.
    TapeMeasure { read_only: bool },
    Other,
}

impl TrackKind {
    /// True for tracks that set scale, origin or orientation.
    pub fn is_calibration_tool(self) -> bool {
        match self {
            TrackKind::CoordAxes | TrackKind::OffsetOrigin | TrackKind::Calibration => true,
            TrackKind::TapeMeasure { read_only } => !read_only,
            TrackKind::PointMass | TrackKind::Other => false,
        }
    }
}

/// A track the tracker can mark.
pub trait Track {
    fn id(&self) -> TrackId;

    fn kind(&self) -> TrackKind;

    fn is_auto_trackable(&self) -> bool {
        true
    }

    /// Tracks that fill in every frame on their own, such as fixed axes.
    fn is_autofill(&self) -> bool {
        false
    }

    /// Index of the track point being marked.
    fn target_index(&self) -> usize;

    fn set_target_index(&mut self, index: usize);

    fn step(&self, frame: usize) -> Option<&Step>;

    fn marked_point(&self, frame: usize, index: usize) -> Option<Point> {
        self.step(frame).and_then(|s| s.point(index))
    }

    fn is_step_complete(&self, frame: usize) -> bool {
        self.step(frame).is_some_and(Step::is_complete)
    }

    /// Marks the target point at `point` and returns where the mark landed.
    fn auto_mark_at(&mut self, frame: usize, point: Point) -> Point;

    fn delete_step(&mut self, frame: usize);

    /// Frames that currently have a step, ascending.
    fn marked_frames(&self) -> Vec<usize>;

    /// Recomputes velocities and accelerations after marks changed.
    fn update_derivatives(&mut self) {}

    /// Tracks whose steps survive a reset.
    fn is_always_marked(&self) -> bool {
        self.is_autofill() || self.kind() == TrackKind::CoordAxes
    }
}

/// Frame source of the clip being tracked.
pub trait VideoSource {
    fn frame_number(&self) -> usize;

    fn set_frame_number(&mut self, frame: usize);

    fn frame_count(&self) -> usize;

    /// Grayscale pixels of the current frame, if decoded.
    fn current_image(&self) -> Option<ImageView<'_, u8>>;

    /// Grayscale pixels of `frame`. Sources that only hold the current frame
    /// keep the default.
    fn frame_image(&self, frame: usize) -> Option<ImageView<'_, u8>> {
        if frame == self.frame_number() {
            self.current_image()
        } else {
            None
        }
    }

    fn image_size(&self) -> Option<(usize, usize)> {
        self.current_image().map(|img| (img.width(), img.height()))
    }

    /// The coordinate system's x axis on `frame`, used for 1-D searches.
    fn axes(&self, frame: usize) -> AxisLine;

    fn can_step(&self) -> bool {
        self.frame_number() + 1 < self.frame_count()
    }

    fn step(&mut self) {
        if self.can_step() {
            self.set_frame_number(self.frame_number() + 1);
        }
    }
}
