//! Bounded LRU Cache
//!
//! Fixed-capacity key-value cache with least-recently-used eviction and
//! O(1) expected get/put.
//!
//! # Design
//!
//! - Arena-and-index recency list: entries live in a contiguous slot table
//!   and link to each other by integer index, with a free-slot list for
//!   recycling. No reference-counted node graphs, no cyclic ownership.
//! - A single mutex around the arena + lookup index; hit/miss/eviction
//!   counters are atomics outside the lock.
//! - Eviction is purely capacity-driven. There is no TTL; expiration is a
//!   distinct concern left to the data access layer if needed.

mod lru;

mod proptest;

pub use lru::{CacheStats, LruCache};

/// Default capacity for the value cache (entries, not bytes)
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Default capacity for the feed-level cache (entries)
pub const DEFAULT_FEED_CACHE_CAPACITY: usize = 1024;
