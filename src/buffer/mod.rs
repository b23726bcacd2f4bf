//! Buffer pool management.
//!
//! The buffer pool keeps a fixed number of page frames in memory, loads and
//! evicts pages on demand, and hands out pinned access to them.
//!
//! # Components
//! - [`BufferPoolManager`] - Frames, page table, free list and eviction
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`BasicPageGuard`] / [`ReadPageGuard`] / [`WritePageGuard`] - RAII pins
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - The LRU-K eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{BasicPageGuard, ReadPageGuard, WritePageGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
