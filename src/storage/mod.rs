//! Storage layer - disk I/O and the page container.
//!
//! - [`DiskManager`] - The persistence seam used by the buffer pool
//! - [`FileDiskManager`] - Single-file backend
//! - [`MemoryDiskManager`] - Shared in-memory backend for tests and benches
//! - [`page`] - The raw page buffer

mod disk_manager;
mod memory_disk_manager;
pub mod page;

pub use disk_manager::{DiskManager, FileDiskManager};
pub use memory_disk_manager::MemoryDiskManager;
