use std::fmt::Debug;

use crate::typedef::FrameId;

/// Hint describing what kind of operation touched a frame. Replacement
/// policies may use it to bias victim selection; the shipped policies treat
/// it as purely informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessType {
    #[default]
    Unknown,
    Scan,
    Lookup,
    Index,
}

pub trait Replacer: Send + Sync + Debug {
    /// Record the event that the given frame id is accessed at current timestamp.
    /// Create a new entry if frame id has not been seen before.
    fn record_access(&mut self, frame_id: FrameId, access_type: AccessType);

    /// Toggles whether a frame may be chosen for eviction. Ignored for frames
    /// with no recorded accesses; idempotent when the flag is unchanged.
    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool);

    /// Attempts to evict a frame based on the replacement policy.
    /// Returns `Some(frame_id)` if a frame is evicted, otherwise `None`.
    fn evict(&mut self) -> Option<FrameId>;

    /// Removes a frame from the replacer. This must only be applied to an
    /// evictable frame; it is a no-op otherwise.
    fn remove(&mut self, frame_id: FrameId);

    /// Returns the number of evictable frames in the replacer.
    fn evictable_count(&self) -> usize;
}
