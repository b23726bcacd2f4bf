//! Buffer Pool Manager - the page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting
//! - Write-back of dirty pages before their frame is reused
//! - LRU-K victim selection

use std::collections::{HashMap, VecDeque};

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::buffer::replacer::LruKReplacer;
use crate::buffer::{BasicPageGuard, BufferPoolStats, Frame, ReadPageGuard, WritePageGuard};
use crate::common::config::BufferPoolConfig;
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// Bookkeeping guarded by the pool latch.
struct PoolState {
    /// Resident pages. Bijective: no page id or frame id appears twice.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no page, fully reset.
    free_list: VecDeque<FrameId>,
}

/// Manages a fixed pool of frames caching disk pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌─────────── latch: Mutex<PoolState> ───────────┐          │
/// │  │ page_table: PageId → FrameId                  │          │
/// │  │ free_list:  VecDeque<FrameId>                 │          │
/// │  └───────────────────────────────────────────────┘          │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐    │
/// │  │ LruKReplacer │  │        frames: Box<[Frame]>       │    │
/// │  │ (own mutex)  │  │  [Frame0] [Frame1] [Frame2] ...   │    │
/// │  └──────────────┘  └───────────────────────────────────┘    │
/// │  ┌──────────────────────────┐                               │
/// │  │ disk_manager: Mutex<..>  │                               │
/// │  └──────────────────────────┘                               │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// Every frame is always in exactly one state: on the free list, pinned, or
/// resident and evictable. A frame is pinned and marked non-evictable
/// before its page is loaded, so no other thread can pick it as a victim
/// until its pin count returns to zero.
///
/// # Locking
/// The pool latch covers the whole "choose frame → write back victim →
/// install mapping → pin → load" sequence. Lock order is pool latch, then
/// replacer, then a frame's page latch, then the disk manager. The pool
/// only takes a page latch under its own latch when the frame is unpinned,
/// so a thread holding a page guard may call back into the pool freely.
///
/// Holding a page latch past `unpin_page`, or calling `flush_page` on a page
/// the same thread holds a write guard for, deadlocks.
///
/// # Usage
/// ```
/// use lrukpool::buffer::BufferPoolManager;
/// use lrukpool::storage::MemoryDiskManager;
///
/// let bpm = BufferPoolManager::new(4, 2, MemoryDiskManager::new());
///
/// let pid = {
///     let mut guard = bpm.new_page_guarded().unwrap().upgrade_write();
///     guard.as_mut_slice()[0] = 0xAB;
///     guard.page_id()
/// };
///
/// let guard = bpm.fetch_page_read(pid).unwrap();
/// assert_eq!(guard.as_slice()[0], 0xAB);
/// ```
pub struct BufferPoolManager {
    /// Fixed arena of frames allocated at startup.
    frames: Box<[Frame]>,

    /// Page table and free list.
    latch: Mutex<PoolState>,

    /// Eviction policy, internally synchronized.
    replacer: LruKReplacer,

    /// Handles all disk I/O and page id allocation.
    disk_manager: Mutex<Box<dyn DiskManager>>,

    /// Performance statistics.
    stats: BufferPoolStats,
}

impl BufferPoolManager {
    /// Create a pool of `pool_size` frames with an LRU-`replacer_k` replacer.
    ///
    /// # Panics
    /// Panics if `pool_size` or `replacer_k` is 0.
    pub fn new(
        pool_size: usize,
        replacer_k: usize,
        disk_manager: impl DiskManager + 'static,
    ) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Box<[Frame]> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: VecDeque<FrameId> = (0..pool_size).map(FrameId::new).collect();

        debug!("buffer pool created: {} frames, k = {}", pool_size, replacer_k);

        Self {
            frames,
            latch: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
            }),
            replacer: LruKReplacer::new(pool_size, replacer_k),
            disk_manager: Mutex::new(Box::new(disk_manager)),
            stats: BufferPoolStats::new(),
        }
    }

    /// Create a pool from a validated configuration.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if the configuration is rejected.
    pub fn with_config(
        config: BufferPoolConfig,
        disk_manager: impl DiskManager + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.pool_size, config.replacer_k, disk_manager))
    }

    // ========================================================================
    // Public API: raw pages
    // ========================================================================

    /// Allocate a fresh page id and give it a zeroed, pinned frame.
    ///
    /// The caller owns one pin and must release it with
    /// [`unpin_page`](Self::unpin_page).
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    /// - `Error::PageIdsExhausted` if the disk manager has no ids left
    /// - I/O errors from writing back a dirty victim
    pub fn new_page(&self) -> Result<(PageId, &Frame)> {
        let (page_id, frame_id) = self.new_frame()?;
        Ok((page_id, &self.frames[frame_id.0]))
    }

    /// Pin `page_id`, loading it from disk if it is not resident.
    ///
    /// The caller owns one pin and must release it with
    /// [`unpin_page`](Self::unpin_page).
    ///
    /// # Errors
    /// - `Error::InvalidPageId` for the sentinel id
    /// - `Error::NoFreeFrames` if the page is not resident and every frame
    ///   is pinned
    /// - I/O errors from the victim write-back or the page read
    pub fn fetch_page(&self, page_id: PageId) -> Result<&Frame> {
        let frame_id = self.fetch_frame(page_id)?;
        Ok(&self.frames[frame_id.0])
    }

    /// Release one pin on `page_id`, OR-ing `is_dirty` into its dirty flag.
    ///
    /// When the last pin goes the frame becomes evictable. Returns `false`
    /// if the page is not resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let state = self.latch.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            warn!("unpin of non-resident {}", page_id);
            return false;
        };

        let frame = &self.frames[frame_id.0];
        if !frame.is_pinned() {
            warn!("unpin of {} with pin count 0", page_id);
            return false;
        }

        if is_dirty {
            frame.mark_dirty();
        }
        if frame.unpin() == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Write `page_id` to disk, dirty or not, and clear its dirty flag.
    ///
    /// Returns `Ok(false)` if the page is not resident. The page is pinned
    /// for the duration of the write, which happens outside the pool latch.
    ///
    /// # Errors
    /// I/O errors from the disk manager; the page stays dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let frame_id = {
            let state = self.latch.lock();
            let Some(&frame_id) = state.page_table.get(&page_id) else {
                return Ok(false);
            };
            self.frames[frame_id.0].pin();
            self.replacer.set_evictable(frame_id, false);
            frame_id
        };

        let written = self.write_back(&self.frames[frame_id.0], page_id);
        self.unpin_page(page_id, false);
        written.map(|()| true)
    }

    /// Flush every resident page.
    ///
    /// Keeps going past individual failures.
    ///
    /// # Errors
    /// The first I/O error encountered.
    pub fn flush_all_pages(&self) -> Result<()> {
        let page_ids: Vec<PageId> = self.latch.lock().page_table.keys().copied().collect();

        let mut first_error = None;
        for page_id in page_ids {
            if let Err(err) = self.flush_page(page_id) {
                warn!("failed to flush {}: {}", page_id, err);
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Drop `page_id` from the pool and hand its id back to the disk manager.
    ///
    /// Returns `true` if the page was deleted or was not resident, `false`
    /// if it is still pinned. Unflushed changes are discarded.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut state = self.latch.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return true;
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            debug!("refusing to delete pinned {}", page_id);
            return false;
        }

        state.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        frame.reset();
        state.free_list.push_back(frame_id);

        self.disk_manager.lock().deallocate_page(page_id);
        self.stats.record_delete();
        debug!("deleted {} from {}", page_id, frame_id);
        true
    }

    // ========================================================================
    // Public API: guarded pages
    // ========================================================================

    /// Like [`new_page`](Self::new_page), returning a guard that unpins on drop.
    pub fn new_page_guarded(&self) -> Result<BasicPageGuard<'_>> {
        let (page_id, frame_id) = self.new_frame()?;
        Ok(BasicPageGuard::new(self, frame_id, page_id))
    }

    /// Like [`fetch_page`](Self::fetch_page), returning a guard that unpins
    /// on drop.
    pub fn fetch_page_basic(&self, page_id: PageId) -> Result<BasicPageGuard<'_>> {
        let frame_id = self.fetch_frame(page_id)?;
        Ok(BasicPageGuard::new(self, frame_id, page_id))
    }

    /// Fetch a page and hold its shared latch.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadPageGuard<'_>> {
        Ok(self.fetch_page_basic(page_id)?.upgrade_read())
    }

    /// Fetch a page and hold its exclusive latch.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WritePageGuard<'_>> {
        Ok(self.fetch_page_basic(page_id)?.upgrade_write())
    }

    // ========================================================================
    // Public API: introspection
    // ========================================================================

    /// Pin count of a resident page.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.latch.lock();
        state
            .page_table
            .get(&page_id)
            .map(|&frame_id| self.frames[frame_id.0].pin_count())
    }

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// The replacer's K.
    pub fn replacer_k(&self) -> usize {
        self.replacer.k()
    }

    /// Number of frames on the free list.
    pub fn free_frame_count(&self) -> usize {
        self.latch.lock().free_list.len()
    }

    /// Number of resident pages.
    pub fn page_count(&self) -> usize {
        self.latch.lock().page_table.len()
    }

    /// Number of resident, unpinned frames.
    pub fn evictable_count(&self) -> usize {
        self.replacer.size()
    }

    /// Number of frames with a pin count above zero.
    pub fn pinned_frame_count(&self) -> usize {
        self.frames.iter().filter(|frame| frame.is_pinned()).count()
    }

    // ========================================================================
    // Internal
    // ========================================================================

    #[inline]
    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.0]
    }

    fn new_frame(&self) -> Result<(PageId, FrameId)> {
        let mut state = self.latch.lock();

        let frame_id = self.acquire_frame(&mut state)?;
        let allocated = self.disk_manager.lock().allocate_page();
        let page_id = match allocated {
            Ok(page_id) => page_id,
            Err(err) => {
                state.free_list.push_back(frame_id);
                return Err(err);
            }
        };

        self.pin_fresh(frame_id, page_id);
        state.page_table.insert(page_id, frame_id);

        trace!("new {} in {}", page_id, frame_id);
        Ok((page_id, frame_id))
    }

    fn fetch_frame(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }

        let mut state = self.latch.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frames[frame_id.0].pin();
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);
            self.stats.record_hit();
            return Ok(frame_id);
        }

        self.stats.record_miss();
        let frame_id = self.acquire_frame(&mut state)?;
        self.pin_fresh(frame_id, page_id);

        let loaded = {
            let mut page = self.frames[frame_id.0].page_mut();
            let mut disk = self.disk_manager.lock();
            disk.read_page(page_id, &mut page)
        };
        if let Err(err) = loaded {
            warn!("failed to load {}: {}", page_id, err);
            self.release_fresh(&mut state, frame_id);
            return Err(err);
        }

        self.stats.record_read();
        state.page_table.insert(page_id, frame_id);
        trace!("loaded {} into {}", page_id, frame_id);
        Ok(frame_id)
    }

    /// Take a frame from the free list, or evict one.
    ///
    /// A dirty victim is written back first. If that fails the victim stays
    /// resident and evictable and nothing else changes. The returned frame
    /// is reset and unmapped.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.evict().ok_or(Error::NoFreeFrames)?;
        let frame = &self.frames[frame_id.0];
        let victim = frame.page_id();

        if frame.is_dirty() {
            if let Err(err) = self.write_back(frame, victim) {
                warn!("write-back of {} failed, keeping it resident: {}", victim, err);
                self.replacer.record_access(frame_id);
                self.replacer.set_evictable(frame_id, true);
                return Err(err);
            }
        }

        state.page_table.remove(&victim);
        frame.reset();
        self.stats.record_eviction();
        debug!("evicted {} from {}", victim, frame_id);
        Ok(frame_id)
    }

    /// Claim a reset frame for `page_id`: one pin, one access, non-evictable.
    fn pin_fresh(&self, frame_id: FrameId, page_id: PageId) {
        let frame = &self.frames[frame_id.0];
        frame.set_page_id(page_id);
        frame.pin();
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);
    }

    /// Undo [`pin_fresh`](Self::pin_fresh) and put the frame back on the
    /// free list.
    fn release_fresh(&self, state: &mut PoolState, frame_id: FrameId) {
        self.frames[frame_id.0].reset();
        self.replacer.set_evictable(frame_id, true);
        self.replacer.remove(frame_id);
        state.free_list.push_back(frame_id);
    }

    /// Write a frame's bytes as `page_id` and clear its dirty flag.
    fn write_back(&self, frame: &Frame, page_id: PageId) -> Result<()> {
        let page = frame.page();
        self.disk_manager.lock().write_page(page_id, &page)?;
        frame.clear_dirty();
        self.stats.record_write();
        trace!("wrote {}", page_id);
        Ok(())
    }
}
