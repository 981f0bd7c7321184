//! Autotrack is a template-matching auto-tracker for frame-by-frame video
//! motion analysis.
//!
//! The user marks a feature once on a key frame. The tracker then places a
//! search rectangle on each following frame, asks a [`Matcher`] to find the
//! feature's template inside it, marks the track when the match is good,
//! evolves the template, and extrapolates the motion to place the next search.
//! Frames it cannot mark with confidence pause the run for the user.
//!
//! [`SsdMatcher`] is the reference matcher; hosts may supply their own through
//! [`MatcherFactory`]. Decoding image files is available with the `image-io`
//! feature, parallel matching with `rayon`, and logging with `tracing`.

pub mod classify;
pub mod geom;
pub mod image;
pub mod matcher;
pub mod options;
pub mod predict;
pub mod search;
pub mod store;
pub mod template;
mod trace;
pub mod tracker;
pub mod util;

pub use classify::{classify, FrameFacts, StatusCode, Thresholds};
pub use geom::{IntRect, Point, Rect};
#[cfg(feature = "image-io")]
pub use crate::image::io;
pub use crate::image::{ImageView, OwnedImage};
pub use matcher::{AxisLine, MatchScore, Matcher, MatcherFactory, SsdMatcher};
pub use options::AutoTrackOptions;
pub use search::{clamp_rect_into_image, SearchRegion};
pub use store::{Bucket, FrameData, FrameDataStore, FrameRecord, KeyFrameData, TrackId};
pub use template::{EllipseMask, Template, TemplateManager};
pub use tracker::{
    AutoTracker, FrameSequence, PointTrack, Step, TickOutcome, Track, TrackKind, TrackerState,
    VideoSource,
};
pub use util::{AutoTrackError, AutoTrackResult};
