//! Eviction policy.
//!
//! - [`LruKReplacer`] - LRU-K over backward k-distance
//!
//! The replacer only knows frame ids and access times. It never sees page
//! ids, disk, or page contents.

mod lru_k;

pub use lru_k::{KDistance, LruKReplacer};
