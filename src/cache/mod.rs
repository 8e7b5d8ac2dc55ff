//! Content and media caching
//!
//! - Byte-level content cache abstraction plus an in-memory store
//! - Media cache with deduplicated downloads, ordered batches and prefetch

pub mod content;
pub mod media;

pub use content::{CacheStats, ContentCache, MemoryContentCache};
pub use media::{MediaCache, MediaKind, PrefetchReport};
