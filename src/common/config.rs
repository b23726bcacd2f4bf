//! Configuration for the buffer pool.

use crate::common::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// Shared by frames in the buffer pool and every [`DiskManager`] backend, so a
/// page read from disk always fills exactly one frame.
///
/// [`DiskManager`]: crate::storage::DiskManager
pub const PAGE_SIZE: usize = 4096;

/// Default number of frames in a pool.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Default history depth for the LRU-K replacer.
pub const DEFAULT_REPLACER_K: usize = 10;

/// Tunables for a [`BufferPoolManager`](crate::buffer::BufferPoolManager).
///
/// # Example
/// ```
/// use lrukpool::common::config::BufferPoolConfig;
///
/// let config = BufferPoolConfig::default().with_pool_size(64).with_replacer_k(2);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.pool_size, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames allocated at construction.
    pub pool_size: usize,
    /// How many past accesses the replacer remembers per frame.
    pub replacer_k: usize,
}

impl BufferPoolConfig {
    /// Set the number of frames.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the replacer's K.
    pub fn with_replacer_k(mut self, replacer_k: usize) -> Self {
        self.replacer_k = replacer_k;
        self
    }

    /// Reject configurations the pool cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool_size must be > 0".into()));
        }
        if self.replacer_k == 0 {
            return Err(Error::InvalidConfig("replacer_k must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            replacer_k: DEFAULT_REPLACER_K,
        }
    }
}
