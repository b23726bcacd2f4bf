//! In-memory disk manager.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{PageId, Result};
use crate::storage::disk_manager::{next_page_id, DiskManager};
use crate::storage::page::Page;

#[derive(Default)]
struct MemoryStore {
    pages: HashMap<PageId, Box<Page>>,
    next_page_id: u32,
    fail_io: bool,
}

/// A [`DiskManager`] that keeps pages in a shared map.
///
/// Clones share the same store, so a test can hand one clone to the buffer
/// pool and keep another to inspect what actually reached "disk".
///
/// # Example
/// ```
/// use lrukpool::storage::{DiskManager, MemoryDiskManager};
/// use lrukpool::Page;
///
/// let disk = MemoryDiskManager::new();
/// let mut handle = disk.clone();
///
/// let pid = handle.allocate_page().unwrap();
/// let mut page = Page::new();
/// page.as_mut_slice()[0] = 7;
/// handle.write_page(pid, &page).unwrap();
///
/// assert_eq!(disk.read_bytes(pid).unwrap()[0], 7);
/// ```
#[derive(Clone, Default)]
pub struct MemoryDiskManager {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryDiskManager {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `page_id` has been written at least once.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.store.lock().pages.contains_key(&page_id)
    }

    /// Copy of the stored bytes of `page_id`, if it was ever written.
    pub fn read_bytes(&self, page_id: PageId) -> Option<Vec<u8>> {
        self.store
            .lock()
            .pages
            .get(&page_id)
            .map(|page| page.as_slice().to_vec())
    }

    /// Number of distinct pages written.
    pub fn page_count(&self) -> usize {
        self.store.lock().pages.len()
    }

    /// Make every subsequent read and write fail (or succeed again).
    pub fn inject_io_failures(&self, fail: bool) {
        self.store.lock().fail_io = fail;
    }

    #[cfg(test)]
    pub(crate) fn set_next_page_id(&self, next: u32) {
        self.store.lock().next_page_id = next;
    }

    fn injected_failure() -> crate::common::Error {
        io::Error::other("injected I/O failure").into()
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        let store = self.store.lock();
        if store.fail_io {
            return Err(Self::injected_failure());
        }
        match store.pages.get(&page_id) {
            Some(stored) => page.copy_from(stored),
            None => page.reset(),
        }
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let mut store = self.store.lock();
        if store.fail_io {
            return Err(Self::injected_failure());
        }
        store
            .pages
            .entry(page_id)
            .or_insert_with(|| Box::new(Page::new()))
            .copy_from(page);
        Ok(())
    }

    fn allocate_page(&mut self) -> Result<PageId> {
        next_page_id(&mut self.store.lock().next_page_id)
    }

    fn deallocate_page(&mut self, page_id: PageId) {
        self.store.lock().pages.remove(&page_id);
    }
}
