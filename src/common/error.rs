//! Error types for the buffer pool.

use thiserror::Error;

use crate::common::PageId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable failures surfaced by the pool and its disk managers.
///
/// Caller bugs at the pool level (unpinning a page that is not pinned) are
/// reported as `false` from the operation instead. Replacer invariant
/// violations panic.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a disk manager.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Every frame is pinned: nothing on the free list and nothing evictable.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// The sentinel page id was passed where a real page is required.
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    /// Every page id below the sentinel has been handed out.
    #[error("Page IDs exhausted")]
    PageIdsExhausted,

    /// A configuration value the pool cannot run with.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoFreeFrames;
        assert_eq!(format!("{}", err), "No free frames available in buffer pool");

        let err = Error::InvalidPageId(PageId::INVALID);
        assert_eq!(format!("{}", err), "Invalid page ID: Page(INVALID)");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
        assert!(std::error::Error::source(&Error::from(std::io::Error::other("x"))).is_some());
    }
}
