//! Page container.
//!
//! The pool never interprets page contents; [`Page`] is only the fixed-size
//! byte buffer moved between frames and disk.

#[allow(clippy::module_inception)]
mod page;

pub use page::Page;
