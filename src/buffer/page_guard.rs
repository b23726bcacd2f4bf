//! RAII guards for pinned pages.
//!
//! - [`BasicPageGuard`] - Owns one pin, latches only while you touch the data
//! - [`ReadPageGuard`] - Pin plus the shared page latch
//! - [`WritePageGuard`] - Pin plus the exclusive page latch
//!
//! Every guard releases its pin exactly once, when dropped or when
//! [`drop_guard`](BasicPageGuard::drop_guard) is called. Latched guards
//! release the latch before the pin. None of them is `Clone`: a copy would
//! unpin a page it never pinned.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Guard owning one pin on a page.
///
/// # Example
/// ```
/// use lrukpool::buffer::BufferPoolManager;
/// use lrukpool::storage::MemoryDiskManager;
///
/// let bpm = BufferPoolManager::new(2, 2, MemoryDiskManager::new());
/// let mut guard = bpm.new_page_guarded().unwrap();
/// let pid = guard.page_id();
///
/// guard.data_mut().as_mut_slice()[0] = 1;
/// assert_eq!(bpm.get_pin_count(pid), Some(1));
///
/// drop(guard);
/// assert_eq!(bpm.get_pin_count(pid), Some(0));
/// ```
pub struct BasicPageGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    /// OR of every write access through this guard.
    is_dirty: bool,
    /// Cleared exactly once, when the pin is handed back.
    owns_pin: bool,
}

impl<'a> BasicPageGuard<'a> {
    /// Wrap a pin the caller already took on `frame_id`.
    pub(crate) fn new(bpm: &'a BufferPoolManager, frame_id: FrameId, page_id: PageId) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            is_dirty: false,
            owns_pin: true,
        }
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Whether the page will be marked dirty on release.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Shared latch on the page, held until the returned guard drops.
    ///
    /// The latch borrows this guard, so it cannot outlive the pin:
    ///
    /// ```compile_fail
    /// use lrukpool::buffer::BufferPoolManager;
    /// use lrukpool::storage::MemoryDiskManager;
    ///
    /// let bpm = BufferPoolManager::new(1, 2, MemoryDiskManager::new());
    /// let latch = {
    ///     let guard = bpm.new_page_guarded().unwrap();
    ///     guard.data()
    /// };
    /// drop(latch);
    /// ```
    pub fn data(&self) -> RwLockReadGuard<'_, Page> {
        self.bpm.frame(self.frame_id).page()
    }

    /// Exclusive latch on the page. Marks this guard dirty.
    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Page> {
        self.is_dirty = true;
        self.bpm.frame(self.frame_id).page_mut()
    }

    /// Take the shared latch, keeping the same pin.
    pub fn upgrade_read(self) -> ReadPageGuard<'a> {
        let bpm = self.bpm;
        let latch = bpm.frame(self.frame_id).page();
        ReadPageGuard { latch, guard: self }
    }

    /// Take the exclusive latch, keeping the same pin.
    pub fn upgrade_write(self) -> WritePageGuard<'a> {
        let bpm = self.bpm;
        let latch = bpm.frame(self.frame_id).page_mut();
        WritePageGuard { latch, guard: self }
    }

    /// Release the pin now.
    pub fn drop_guard(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.owns_pin {
            return;
        }
        self.owns_pin = false;
        let released = self.bpm.unpin_page(self.page_id, self.is_dirty);
        debug_assert!(released, "guard for {} lost its pin", self.page_id);
    }
}

impl Drop for BasicPageGuard<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Guard holding a pin and the shared latch on a page.
///
/// Many `ReadPageGuard`s may exist for the same page at once.
///
/// # Example
/// ```ignore
/// let guard = bpm.fetch_page_read(page_id)?;
/// let first = guard.as_slice()[0];
/// // latch released, then page unpinned
/// ```
pub struct ReadPageGuard<'a> {
    // Field order is drop order: latch before pin.
    latch: RwLockReadGuard<'a, Page>,
    guard: BasicPageGuard<'a>,
}

impl ReadPageGuard<'_> {
    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.guard.frame_id()
    }

    /// Release the latch and the pin now.
    pub fn drop_guard(self) {
        drop(self);
    }
}

impl Deref for ReadPageGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.latch
    }
}

/// Guard holding a pin and the exclusive latch on a page.
///
/// The page is marked dirty on release once it has been mutably
/// dereferenced, or explicitly via [`mark_dirty`](Self::mark_dirty).
pub struct WritePageGuard<'a> {
    // Field order is drop order: latch before pin.
    latch: RwLockWriteGuard<'a, Page>,
    guard: BasicPageGuard<'a>,
}

impl WritePageGuard<'_> {
    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.guard.frame_id()
    }

    /// Whether the page will be marked dirty on release.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.guard.is_dirty()
    }

    /// Force a write-back on eviction even without a mutable access.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.guard.is_dirty = true;
    }

    /// Release the latch and the pin now.
    pub fn drop_guard(self) {
        drop(self);
    }
}

impl Deref for WritePageGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.latch
    }
}

impl DerefMut for WritePageGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.guard.is_dirty = true;
        &mut self.latch
    }
}
