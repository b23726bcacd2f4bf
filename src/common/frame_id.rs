//! Frame identifier type.

use std::fmt;

/// Identifies a frame in the buffer pool.
///
/// Frames live in a fixed arena allocated once by the pool, so a `FrameId`
/// is a plain index: `frames[frame_id.0]`. It never refers to a page; the
/// page held by a frame changes every time the frame is reused.
///
/// # Example
/// ```
/// use lrukpool::FrameId;
///
/// let frame_id = FrameId::new(5);
/// assert_eq!(frame_id.index(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl FrameId {
    /// Create a new FrameId.
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }

    /// Position of the frame in the pool's arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_ordering() {
        assert!(FrameId::new(1) < FrameId::new(2));
        assert_eq!(FrameId::new(7).index(), 7);
    }

    #[test]
    fn test_frame_id_display() {
        assert_eq!(format!("{}", FrameId::new(42)), "Frame(42)");
    }
}
