use super::replacer::{AccessType, Replacer};
use crate::typedef::FrameId;
use std::collections::VecDeque;

/// Per-frame bookkeeping for the LRU-K policy.
#[derive(Debug, Clone, Default)]
struct FrameState {
    use_count: usize,
    is_evictable: bool,
}

/// Implements the LRU-K replacement policy over a fixed set of frames.
///
/// A frame with fewer than `k` recorded accesses sits in the history ring,
/// ordered by its first access. A frame with at least `k` accesses sits in
/// the cache ring, ordered by its last access. History frames have infinite
/// backward k-distance, so eviction drains the history ring oldest-first
/// before it ever considers the cache ring.
#[derive(Debug)]
pub struct LrukReplacer {
    /// Frames with fewer than k accesses, newest first access at the front.
    history: VecDeque<FrameId>,
    /// Frames with at least k accesses, most recently accessed at the front.
    cache: VecDeque<FrameId>,
    frames: Vec<FrameState>,
    evictable_size: usize, // Number of evictable frames
    k: usize,              // Number of accesses that promote a frame to the cache ring
}

impl LrukReplacer {
    /// Creates an LRU-K replacer managing frame ids `0..num_frames`.
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k > 0, "LRU-K requires k >= 1");
        LrukReplacer {
            history: VecDeque::new(),
            cache: VecDeque::new(),
            frames: vec![FrameState::default(); num_frames],
            evictable_size: 0,
            k,
        }
    }

    /// Out-of-range frame ids are a caller bug, not a runtime condition.
    fn check_frame_id(&self, frame_id: FrameId) {
        if frame_id >= self.frames.len() {
            panic!(
                "Frame id {} out of range for a replacer over {} frames",
                frame_id,
                self.frames.len()
            );
        }
    }

    fn unlink(ring: &mut VecDeque<FrameId>, frame_id: FrameId) {
        if let Some(pos) = ring.iter().position(|&f| f == frame_id) {
            ring.remove(pos);
        }
    }
}

impl Replacer for LrukReplacer {
    /// Records an access and moves the frame between rings as its count crosses k.
    fn record_access(&mut self, frame_id: FrameId, _access_type: AccessType) {
        self.check_frame_id(frame_id);
        self.frames[frame_id].use_count += 1;
        let use_count = self.frames[frame_id].use_count;

        if use_count == self.k {
            // The k-th access promotes the frame out of the history ring.
            Self::unlink(&mut self.history, frame_id);
            self.cache.push_front(frame_id);
        } else if use_count > self.k {
            // Standard LRU update within the cache ring.
            Self::unlink(&mut self.cache, frame_id);
            self.cache.push_front(frame_id);
        } else if use_count == 1 {
            // History ordering reflects the first access; further sub-k
            // accesses leave the ring untouched.
            self.history.push_front(frame_id);
        }
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        self.check_frame_id(frame_id);
        let state = &mut self.frames[frame_id];
        // A frame that was never accessed is not tracked yet.
        if state.use_count == 0 {
            return;
        }
        if state.is_evictable != evictable {
            state.is_evictable = evictable;
            if evictable {
                self.evictable_size += 1;
            } else {
                self.evictable_size -= 1;
            }
        }
    }

    /// Evicts the evictable frame with the largest backward k-distance.
    fn evict(&mut self) -> Option<FrameId> {
        let victim = if let Some(pos) = self
            .history
            .iter()
            .rposition(|&f| self.frames[f].is_evictable)
        {
            self.history.remove(pos).unwrap()
        } else if let Some(pos) = self.cache.iter().rposition(|&f| self.frames[f].is_evictable) {
            self.cache.remove(pos).unwrap()
        } else {
            return None;
        };

        let state = &mut self.frames[victim];
        state.use_count = 0;
        state.is_evictable = false;
        self.evictable_size -= 1;
        Some(victim)
    }

    /// Drops a specific frame from the replacer if it is evictable.
    fn remove(&mut self, frame_id: FrameId) {
        self.check_frame_id(frame_id);
        if !self.frames[frame_id].is_evictable {
            return;
        }

        if self.frames[frame_id].use_count < self.k {
            Self::unlink(&mut self.history, frame_id);
        } else {
            Self::unlink(&mut self.cache, frame_id);
        }

        let state = &mut self.frames[frame_id];
        state.use_count = 0;
        state.is_evictable = false;
        self.evictable_size -= 1;
    }

    fn evictable_count(&self) -> usize {
        self.evictable_size
    }
}
