//! Disk Manager - the persistence seam under the buffer pool.
//!
//! The pool only ever asks for whole pages by id. [`DiskManager`] is the
//! trait it talks to; [`FileDiskManager`] keeps every page in one file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::trace;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Synchronous page store plus page-id allocator.
///
/// The buffer pool serializes all calls, so implementations take `&mut self`
/// and need no internal locking.
pub trait DiskManager: Send {
    /// Fill `page` with the stored bytes of `page_id`.
    ///
    /// A page that was allocated but never written reads as zeroes.
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()>;

    /// Persist the bytes of `page` as `page_id`.
    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()>;

    /// Hand out the next page id. Ids increase monotonically.
    ///
    /// # Errors
    /// `Error::PageIdsExhausted` once the next id would be the sentinel.
    fn allocate_page(&mut self) -> Result<PageId>;

    /// Hook for reclaiming a deleted page's id.
    ///
    /// The default does nothing, so ids are never reused.
    fn deallocate_page(&mut self, _page_id: PageId) {}
}

/// Keeps a database in a single file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Pages are written lazily: allocating an id does not touch the file, and
/// reading a page beyond the end of the file yields a zeroed page. Writing
/// past the end extends the file.
///
/// # Durability
/// Every write is followed by `fsync()`.
pub struct FileDiskManager {
    file: File,
    /// Number of pages physically present in the file.
    page_count: u32,
    /// Next id returned by `allocate_page`.
    next_page_id: u32,
}

impl FileDiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
            next_page_id: 0,
        })
    }

    /// Open an existing database file.
    ///
    /// Page id allocation resumes after the last page in the file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let page_count = file_size.div_ceil(PAGE_SIZE as u64) as u32;

        Ok(Self {
            file,
            page_count,
            next_page_id: page_count,
        })
    }

    /// Open an existing database file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Number of pages physically present in the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Size of the database file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (PAGE_SIZE as u64)
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        if page_id.0 >= self.page_count {
            trace!("{} is beyond end of file, reading zeroes", page_id);
            page.reset();
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        self.file.read_exact(page.as_mut_slice())?;
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;

        self.page_count = self.page_count.max(page_id.0 + 1);
        Ok(())
    }

    fn allocate_page(&mut self) -> Result<PageId> {
        let page_id = next_page_id(&mut self.next_page_id)?;
        trace!("allocated {}", page_id);
        Ok(page_id)
    }
}

/// Take `counter` as a page id and advance it, refusing the sentinel.
pub(crate) fn next_page_id(counter: &mut u32) -> Result<PageId> {
    let page_id = PageId::new(*counter);
    if !page_id.is_valid() {
        return Err(Error::PageIdsExhausted);
    }
    *counter += 1;
    Ok(page_id)
}
