//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds one [`Page`] buffer plus the metadata the pool needs:
//! - Which page is resident (or [`PageId::INVALID`] when free)
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// A frame in the buffer pool.
///
/// Frames are allocated once when the pool is built and are never created
/// or destroyed afterwards; only the identity of the page they hold changes.
///
/// # Thread Safety
/// - `page`: `RwLock`, the page latch taken by read/write guards
/// - `page_id`, `pin_count`, `is_dirty`: atomics so they can be read
///   without the pool latch. They are only *written* by the pool while it
///   holds its latch, so a frame is always in exactly one of the states
///   free, pinned, or evictable.
///
/// Callers get `&Frame` from the raw pool API and may read and write page
/// bytes through the latch, but cannot change the bookkeeping.
pub struct Frame {
    /// The page data, protected by RwLock.
    page: RwLock<Page>,

    /// Resident page, `PageId::INVALID` when free.
    page_id: AtomicU32,

    /// Number of active users of this frame.
    pin_count: AtomicU32,

    /// Whether the page has been modified since it was loaded or flushed.
    is_dirty: AtomicBool,
}

impl Frame {
    /// Create a new free frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            page_id: AtomicU32::new(PageId::INVALID.0),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Page latch
    // ========================================================================

    /// Acquire the shared page latch.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire the exclusive page latch.
    ///
    /// Writing through a raw frame does not mark it dirty; pass
    /// `is_dirty = true` to `unpin_page` for that.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    // ========================================================================
    // Metadata reads
    // ========================================================================

    /// The resident page, `PageId::INVALID` if the frame is free.
    #[inline]
    pub fn page_id(&self) -> PageId {
        PageId(self.page_id.load(Ordering::Acquire))
    }

    /// Get the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Check if the frame is currently pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Check if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    /// Check if the frame holds no page.
    #[inline]
    pub fn is_free(&self) -> bool {
        !self.page_id().is_valid()
    }

    // ========================================================================
    // Metadata writes (pool only)
    // ========================================================================

    #[inline]
    pub(crate) fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id.0, Ordering::Release);
    }

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub(crate) fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Release);
    }

    /// Return the frame to the free state: zeroed page, no page id,
    /// unpinned and clean.
    ///
    /// Takes the page latch, so the caller must know nobody else holds it.
    pub(crate) fn reset(&self) {
        self.page_mut().reset();
        self.set_page_id(PageId::INVALID);
        self.pin_count.store(0, Ordering::Release);
        self.clear_dirty();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
