//! Frame-indexed cache of tracking state.
//!
//! Records are grouped per track and per point index into a [`Bucket`],
//! ordered by frame number. A bucket keeps a sorted index of its key frames,
//! so resolving the key frame that governs any frame is a single range query.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

mod frame;

pub use frame::{FrameData, FrameRecord, KeyFrameData, MatchPoints, SearchPoints};

use crate::geom::Point;

/// Identity of a host track.
pub type TrackId = u64;

/// All records for one (track, point index).
#[derive(Clone, Debug)]
pub struct Bucket<M> {
    index: usize,
    frames: BTreeMap<usize, FrameRecord<M>>,
    key_frames: BTreeSet<usize>,
}

impl<M> Bucket<M> {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            frames: BTreeMap::new(),
            key_frames: BTreeSet::new(),
        }
    }

    /// Point index of the track this bucket belongs to.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame: usize) -> Option<&FrameRecord<M>> {
        self.frames.get(&frame)
    }

    pub fn get_mut(&mut self, frame: usize) -> Option<&mut FrameRecord<M>> {
        self.frames.get_mut(&frame)
    }

    /// Returns the record for `frame`, allocating an empty one on first use.
    pub fn get_or_create(&mut self, frame: usize) -> &mut FrameRecord<M> {
        let index = self.index;
        self.frames
            .entry(frame)
            .or_insert_with(|| FrameRecord::Plain(FrameData::new(index, frame)))
    }

    /// Records in frame order.
    pub fn frames(&self) -> impl Iterator<Item = (usize, &FrameRecord<M>)> + '_ {
        self.frames.iter().map(|(n, r)| (*n, r))
    }

    /// Installs a fresh key frame at `frame`, replacing any existing record.
    pub fn insert_key_frame(&mut self, frame: usize, key: KeyFrameData<M>) -> &mut FrameRecord<M> {
        self.key_frames.insert(frame);
        let record = FrameRecord::Key(FrameData::new(self.index, frame), Box::new(key));
        self.frames.insert(frame, record);
        self.get_or_create(frame)
    }

    pub fn is_key_frame(&self, frame: usize) -> bool {
        self.key_frames.contains(&frame)
    }

    /// Key-frame numbers in ascending order.
    pub fn key_frames(&self) -> Vec<usize> {
        self.key_frames.iter().copied().collect()
    }

    pub fn first_key_frame(&self) -> Option<usize> {
        self.key_frames.first().copied()
    }

    /// Largest key-frame number `<= frame`. Later key frames never govern.
    pub fn nearest_key_frame_number(&self, frame: usize) -> Option<usize> {
        self.key_frames.range(..=frame).next_back().copied()
    }

    pub fn next_key_frame_after(&self, frame: usize) -> Option<usize> {
        self.key_frames
            .range((Bound::Excluded(frame), Bound::Unbounded))
            .next()
            .copied()
    }

    /// Key-frame data governing `frame`.
    pub fn nearest_key_frame(&self, frame: usize) -> Option<&KeyFrameData<M>> {
        let n = self.nearest_key_frame_number(frame)?;
        self.frames.get(&n).and_then(FrameRecord::key)
    }

    pub fn nearest_key_frame_mut(&mut self, frame: usize) -> Option<&mut KeyFrameData<M>> {
        let n = self.nearest_key_frame_number(frame)?;
        self.frames.get_mut(&n).and_then(FrameRecord::key_mut)
    }

    /// Target offset inherited from the governing key frame.
    pub fn target_offset(&self, frame: usize) -> Option<Point> {
        self.nearest_key_frame(frame).map(|k| k.target_offset)
    }

    /// Drops cached search points after `frame`, up to the next key frame.
    pub fn clear_search_points_after(&mut self, frame: usize) {
        let stop = self.next_key_frame_after(frame);
        let upper = stop.map_or(Bound::Unbounded, Bound::Excluded);
        for (_, record) in self.frames.range_mut((Bound::Excluded(frame), upper)) {
            record.data_mut().search_points = None;
        }
    }

    /// Search points of `frame`, or of the nearest earlier record that has
    /// them. The walk stops at a key frame, whose own points are authoritative.
    pub fn inherited_search_points(&self, frame: usize) -> Option<SearchPoints> {
        self.frames
            .range(..=frame)
            .rev()
            .find(|(_, r)| r.data().search_points.is_some() || r.is_key_frame())
            .and_then(|(_, r)| r.data().search_points)
    }

    /// Takes the governing key frame's matcher out for exclusive use.
    ///
    /// Returns the key-frame number to hand it back to with [`Bucket::put_matcher`].
    pub fn take_matcher(&mut self, frame: usize) -> Option<(usize, M)> {
        let n = self.nearest_key_frame_number(frame)?;
        let matcher = self.frames.get_mut(&n)?.key_mut()?.matcher.take()?;
        Some((n, matcher))
    }

    pub fn put_matcher(&mut self, key_frame: usize, matcher: M) {
        if let Some(key) = self.frames.get_mut(&key_frame).and_then(FrameRecord::key_mut) {
            key.matcher = Some(matcher);
        }
    }

    /// Turns the key frame at `frame` into a plain record.
    ///
    /// Match results, search points and marks survive; the template does not.
    pub fn demote_key_frame(&mut self, frame: usize) -> Option<KeyFrameData<M>> {
        if !self.key_frames.remove(&frame) {
            return None;
        }
        let (mut data, key) = match self.frames.remove(&frame)? {
            FrameRecord::Key(data, key) => (data, key),
            plain @ FrameRecord::Plain(_) => {
                self.frames.insert(frame, plain);
                return None;
            }
        };
        data.template = None;
        data.template_alpha = 0;
        data.matcher_id = None;
        data.working_pixels = None;
        self.frames.insert(frame, FrameRecord::Plain(data));
        Some(*key)
    }

    pub fn remove(&mut self, frame: usize) -> Option<FrameRecord<M>> {
        self.key_frames.remove(&frame);
        self.frames.remove(&frame)
    }

    /// Removes every record after `frame`.
    pub fn remove_after(&mut self, frame: usize) {
        let _ = self.frames.split_off(&(frame + 1));
        let _ = self.key_frames.split_off(&(frame + 1));
    }

    /// Removes every record before `end`, or all records when `end` is `None`.
    pub fn remove_before(&mut self, end: Option<usize>) {
        match end {
            Some(end) => {
                self.frames = self.frames.split_off(&end);
                self.key_frames = self.key_frames.split_off(&end);
            }
            None => {
                self.frames.clear();
                self.key_frames.clear();
            }
        }
    }

    /// Removes all records, returning the first key frame there was.
    pub fn clear(&mut self) -> Option<usize> {
        let first = self.first_key_frame();
        self.frames.clear();
        self.key_frames.clear();
        first
    }
}

/// Per-track, per-point-index buckets of frame records.
#[derive(Clone, Debug)]
pub struct FrameDataStore<M> {
    tracks: HashMap<TrackId, BTreeMap<usize, Bucket<M>>>,
}

impl<M> Default for FrameDataStore<M> {
    fn default() -> Self {
        Self {
            tracks: HashMap::new(),
        }
    }
}

impl<M> FrameDataStore<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, track: TrackId, index: usize) -> Option<&Bucket<M>> {
        self.tracks.get(&track)?.get(&index)
    }

    /// Bucket for `(track, index)`, created empty on first use.
    pub fn bucket_mut(&mut self, track: TrackId, index: usize) -> &mut Bucket<M> {
        self.tracks
            .entry(track)
            .or_default()
            .entry(index)
            .or_insert_with(|| Bucket::new(index))
    }

    /// Record for `(track, index, frame)`. Creating a record never searches.
    pub fn get_or_create(&mut self, track: TrackId, index: usize, frame: usize) -> &mut FrameRecord<M> {
        self.bucket_mut(track, index).get_or_create(frame)
    }

    /// Key frame governing `frame`, searching backward only.
    pub fn nearest_key_frame(&self, track: TrackId, index: usize, frame: usize) -> Option<&KeyFrameData<M>> {
        self.bucket(track, index)?.nearest_key_frame(frame)
    }

    /// Drops cached search points downstream of `frame`, up to the next key frame.
    pub fn clear_from(&mut self, track: TrackId, index: usize, frame: usize) {
        if let Some(bucket) = self.tracks.get_mut(&track).and_then(|b| b.get_mut(&index)) {
            bucket.clear_search_points_after(frame);
        }
    }

    pub fn has_track(&self, track: TrackId) -> bool {
        self.tracks.contains_key(&track)
    }

    /// Discards every bucket of `track`.
    pub fn remove_track(&mut self, track: TrackId) -> bool {
        self.tracks.remove(&track).is_some()
    }

    /// Discards everything.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{Bucket, KeyFrameData};
    use crate::geom::Point;

    fn key() -> KeyFrameData<u32> {
        KeyFrameData::new(Point::new(5.0, 5.0), Point::new(10.0, 10.0), 4.0)
    }

    #[test]
    fn demote_keeps_match_results() {
        let mut b: Bucket<u32> = Bucket::new(0);
        b.insert_key_frame(2, key());
        b.get_mut(2).unwrap().data_mut().searched = true;
        assert!(b.demote_key_frame(2).is_some());
        assert!(!b.is_key_frame(2));
        assert!(b.get(2).unwrap().data().searched);
        assert!(b.demote_key_frame(2).is_none());
    }

    #[test]
    fn take_and_put_matcher() {
        let mut b: Bucket<u32> = Bucket::new(0);
        let mut k = key();
        k.matcher = Some(7);
        b.insert_key_frame(1, k);
        let (n, m) = b.take_matcher(4).unwrap();
        assert_eq!((n, m), (1, 7));
        assert!(b.take_matcher(4).is_none());
        b.put_matcher(n, m);
        assert_eq!(b.nearest_key_frame(4).unwrap().matcher, Some(7));
    }

    #[test]
    fn remove_ranges_keep_index_in_sync() {
        let mut b: Bucket<u32> = Bucket::new(0);
        for n in 0..6 {
            b.get_or_create(n);
        }
        b.insert_key_frame(1, key());
        b.insert_key_frame(4, key());
        b.remove_after(3);
        assert_eq!(b.key_frames(), vec![1]);
        assert_eq!(b.len(), 4);
        b.remove_before(Some(2));
        assert_eq!(b.key_frames(), Vec::<usize>::new());
        assert_eq!(b.len(), 2);
    }
}
