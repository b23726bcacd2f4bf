//! lrukpool - a disk-backed buffer pool with LRU-K eviction.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              callers (index / table code)                       │
//! │        new_page / fetch_page / unpin_page / guards              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Buffer Pool (buffer/)                    │   │
//! │  │   BufferPoolManager + Frame + PageGuards + Statistics   │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │     LruKReplacer (backward k-distance)          │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                   │   │
//! │  │    DiskManager trait: FileDiskManager | MemoryDisk..    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and the LRU-K replacer
//! - [`storage`] - Disk I/O and the page container
//!
//! # Quick Start
//! ```no_run
//! use lrukpool::buffer::BufferPoolManager;
//! use lrukpool::storage::FileDiskManager;
//!
//! let dm = FileDiskManager::open_or_create("my_database.db").unwrap();
//! let bpm = BufferPoolManager::new(64, 2, dm);
//!
//! let mut guard = bpm.new_page_guarded().unwrap().upgrade_write();
//! guard.as_mut_slice()[..5].copy_from_slice(b"hello");
//! drop(guard);
//!
//! bpm.flush_all_pages().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

pub use common::config::{BufferPoolConfig, PAGE_SIZE};
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::{
    BasicPageGuard, BufferPoolManager, BufferPoolStats, Frame, ReadPageGuard, StatsSnapshot,
    WritePageGuard,
};
pub use storage::page::Page;
pub use storage::{DiskManager, FileDiskManager, MemoryDiskManager};
