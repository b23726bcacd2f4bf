//! LRU-K replacement policy.
//!
//! Each frame remembers the timestamps of its last K accesses. The victim is
//! the evictable frame whose K-th most recent access lies furthest in the
//! past (its *backward k-distance*). Frames with fewer than K accesses have
//! an infinite distance and are evicted first, oldest first access wins.

use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::FrameId;

/// Backward k-distance of a frame at some instant.
///
/// Variant order matters: `Finite(_) < Infinite`, so the derived `Ord`
/// ranks frames with incomplete history above every frame with K accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KDistance {
    /// `now - timestamp of the K-th most recent access`.
    Finite(u64),
    /// Fewer than K accesses recorded.
    Infinite,
}

/// Access history of one frame.
#[derive(Debug)]
struct LruKNode {
    /// Up to K most recent timestamps, oldest at the front.
    history: VecDeque<u64>,
    is_evictable: bool,
}

impl LruKNode {
    fn new(k: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(k),
            is_evictable: false,
        }
    }

    fn record(&mut self, timestamp: u64, k: usize) {
        if self.history.len() == k {
            self.history.pop_front();
        }
        self.history.push_back(timestamp);
    }

    /// Oldest retained timestamp. Nodes are only created by an access, so
    /// history is never empty.
    fn earliest(&self) -> u64 {
        self.history.front().copied().unwrap_or(0)
    }

    fn k_distance(&self, now: u64, k: usize) -> KDistance {
        if self.history.len() < k {
            KDistance::Infinite
        } else {
            KDistance::Finite(now - self.earliest())
        }
    }
}

#[derive(Debug)]
struct ReplacerState {
    node_store: HashMap<FrameId, LruKNode>,
    /// Logical clock, bumped on every recorded access.
    current_timestamp: u64,
    /// Number of nodes with `is_evictable == true`.
    evictable_count: usize,
}

/// Thread-safe LRU-K replacer.
///
/// All operations take `&self`; one internal mutex makes each of them
/// atomic with respect to the others, including the scan-then-remove in
/// [`evict`](Self::evict).
///
/// # Example
/// ```
/// use lrukpool::buffer::replacer::LruKReplacer;
/// use lrukpool::FrameId;
///
/// let replacer = LruKReplacer::new(4, 2);
/// replacer.record_access(FrameId::new(0));
/// replacer.record_access(FrameId::new(1));
/// replacer.set_evictable(FrameId::new(0), true);
/// replacer.set_evictable(FrameId::new(1), true);
///
/// // Both have infinite distance; frame 0 was seen first.
/// assert_eq!(replacer.evict(), Some(FrameId::new(0)));
/// assert_eq!(replacer.size(), 1);
/// ```
#[derive(Debug)]
pub struct LruKReplacer {
    state: Mutex<ReplacerState>,
    /// Frame ids must be `< num_frames`.
    num_frames: usize,
    k: usize,
}

impl LruKReplacer {
    /// Create a replacer for frames `0..num_frames` remembering `k` accesses.
    ///
    /// # Panics
    /// Panics if `k` is 0.
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k > 0, "k must be > 0");
        Self {
            state: Mutex::new(ReplacerState {
                node_store: HashMap::with_capacity(num_frames),
                current_timestamp: 0,
                evictable_count: 0,
            }),
            num_frames,
            k,
        }
    }

    /// The K this replacer was built with.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Record an access to `frame_id` at the current logical time.
    ///
    /// The first access creates the frame's node, non-evictable.
    ///
    /// # Panics
    /// Panics if `frame_id` is outside the configured capacity.
    pub fn record_access(&self, frame_id: FrameId) {
        assert!(
            frame_id.0 < self.num_frames,
            "{} out of range for replacer of {} frames",
            frame_id,
            self.num_frames
        );

        let mut state = self.state.lock();
        state.current_timestamp += 1;
        let now = state.current_timestamp;
        state
            .node_store
            .entry(frame_id)
            .or_insert_with(|| LruKNode::new(self.k))
            .record(now, self.k);
    }

    /// Mark a frame as evictable or not. Unknown frames are ignored.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut state = self.state.lock();
        let Some(node) = state.node_store.get_mut(&frame_id) else {
            return;
        };
        if node.is_evictable == evictable {
            return;
        }
        node.is_evictable = evictable;
        if evictable {
            state.evictable_count += 1;
        } else {
            state.evictable_count -= 1;
        }
    }

    /// Pick and forget a victim among evictable frames.
    ///
    /// Returns `None` if no frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        let now = state.current_timestamp;

        let victim = state
            .node_store
            .iter()
            .filter(|(_, node)| node.is_evictable)
            .max_by_key(|&(&frame_id, node)| {
                (
                    node.k_distance(now, self.k),
                    Reverse(node.earliest()),
                    Reverse(frame_id),
                )
            })
            .map(|(&frame_id, _)| frame_id)?;

        state.node_store.remove(&victim);
        state.evictable_count -= 1;
        Some(victim)
    }

    /// Forget an evictable frame's history. Unknown frames are ignored.
    ///
    /// # Panics
    /// Panics if the frame is tracked but not evictable.
    pub fn remove(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        let Some(node) = state.node_store.get(&frame_id) else {
            return;
        };
        assert!(
            node.is_evictable,
            "cannot remove non-evictable {} from replacer",
            frame_id
        );
        state.node_store.remove(&frame_id);
        state.evictable_count -= 1;
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().evictable_count
    }

    /// Current backward k-distance of a tracked frame.
    pub fn backward_k_distance(&self, frame_id: FrameId) -> Option<KDistance> {
        let state = self.state.lock();
        let now = state.current_timestamp;
        state
            .node_store
            .get(&frame_id)
            .map(|node| node.k_distance(now, self.k))
    }

    /// Current value of the logical clock.
    pub fn current_timestamp(&self) -> u64 {
        self.state.lock().current_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(id: usize) -> FrameId {
        FrameId::new(id)
    }

    #[test]
    fn test_k_distance_ordering() {
        assert!(KDistance::Finite(u64::MAX) < KDistance::Infinite);
        assert!(KDistance::Finite(3) < KDistance::Finite(4));
    }

    #[test]
    fn test_new_node_is_not_evictable() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(fid(0));
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_set_evictable_unknown_frame_is_noop() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.set_evictable(fid(3), true);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_set_evictable_is_idempotent() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(fid(1));
        replacer.set_evictable(fid(1), true);
        replacer.set_evictable(fid(1), true);
        assert_eq!(replacer.size(), 1);
        replacer.set_evictable(fid(1), false);
        replacer.set_evictable(fid(1), false);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_history_is_bounded_by_k() {
        let replacer = LruKReplacer::new(4, 2);
        for _ in 0..5 {
            replacer.record_access(fid(0));
        }
        // Timestamps 1..=5 recorded, only 4 and 5 retained.
        assert_eq!(
            replacer.backward_k_distance(fid(0)),
            Some(KDistance::Finite(5 - 4))
        );
    }

    #[test]
    fn test_remove_forgets_history() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(fid(2));
        replacer.set_evictable(fid(2), true);

        replacer.remove(fid(2));

        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.backward_k_distance(fid(2)), None);
        // Unknown frame: no-op
        replacer.remove(fid(2));
    }

    #[test]
    #[should_panic(expected = "cannot remove non-evictable")]
    fn test_remove_pinned_frame_panics() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(fid(0));
        replacer.remove(fid(0));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_record_access_out_of_range_panics() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(fid(4));
    }
}
