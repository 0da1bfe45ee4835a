use crate::typedef::FrameId;
use std::collections::HashMap;

use super::replacer::{AccessType, Replacer};

#[derive(Debug)]
struct LruNode {
    frame_id: FrameId,
    is_evictable: bool,
    last_accessed_timestamp: u64,
}

/// Plain LRU replacement: the evictable frame with the oldest access loses.
#[derive(Debug, Default)]
pub struct LruReplacer {
    node_store: HashMap<FrameId, LruNode>,
    evictable_size: usize, // Tracks evictable nodes
    current_timestamp: u64,
}

impl LruReplacer {
    pub fn new() -> Self {
        LruReplacer {
            node_store: HashMap::new(),
            evictable_size: 0,
            current_timestamp: 0,
        }
    }

    /// Increments and returns the current logical timestamp.
    fn advance_timestamp(&mut self) -> u64 {
        let old_timestamp = self.current_timestamp;
        self.current_timestamp += 1;
        old_timestamp
    }
}

impl Replacer for LruReplacer {
    fn record_access(&mut self, frame_id: FrameId, _access_type: AccessType) {
        let timestamp = self.advance_timestamp();
        self.node_store
            .entry(frame_id)
            .and_modify(|node| node.last_accessed_timestamp = timestamp)
            .or_insert(LruNode {
                frame_id,
                is_evictable: false,
                last_accessed_timestamp: timestamp,
            });
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if let Some(node) = self.node_store.get_mut(&frame_id) {
            if node.is_evictable != evictable {
                node.is_evictable = evictable;
                if evictable {
                    self.evictable_size += 1;
                } else {
                    self.evictable_size -= 1;
                }
            }
        }
    }

    /// Evicts the least recently used evictable frame.
    fn evict(&mut self) -> Option<FrameId> {
        let victim = self
            .node_store
            .values()
            .filter(|node| node.is_evictable)
            .min_by_key(|node| node.last_accessed_timestamp)?
            .frame_id;

        self.node_store.remove(&victim);
        self.evictable_size -= 1;
        Some(victim)
    }

    fn remove(&mut self, frame_id: FrameId) {
        let evictable = self
            .node_store
            .get(&frame_id)
            .map(|node| node.is_evictable)
            .unwrap_or(false);
        if evictable {
            self.node_store.remove(&frame_id);
            self.evictable_size -= 1;
        }
    }

    fn evictable_count(&self) -> usize {
        self.evictable_size
    }
}
