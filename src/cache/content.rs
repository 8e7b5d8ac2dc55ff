//! Byte-level content cache
//!
//! [`ContentCache`] is the seam to whatever key/value store the host
//! provides. [`MemoryContentCache`] is a bounded in-process implementation
//! evicting oldest entries first.

use std::collections::{HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;

/// Key/value byte store keyed by canonical resource URL
#[async_trait]
pub trait ContentCache: Send + Sync {
    async fn has(&self, key: &str) -> bool;
    async fn get(&self, key: &str) -> Option<Bytes>;
    async fn set(&self, key: &str, bytes: Bytes);
}

struct Entries {
    by_key: HashMap<String, Bytes>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
    size_bytes: usize,
}

/// In-memory content cache with byte and entry limits
pub struct MemoryContentCache {
    entries: RwLock<Entries>,
    /// Maximum cache size in bytes
    max_size: usize,
    /// Maximum number of entries
    max_entries: usize,
}

impl MemoryContentCache {
    /// Create a new cache with default limits
    pub fn new() -> Self {
        Self::with_limits(50 * 1024 * 1024, 1000)
    }

    /// Create a cache with custom limits
    pub fn with_limits(max_size: usize, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Entries {
                by_key: HashMap::new(),
                order: VecDeque::new(),
                size_bytes: 0,
            }),
            max_size,
            max_entries,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, key: &str, bytes: Bytes) {
        let entry_size = bytes.len();

        // Don't cache if single entry exceeds max size
        if entry_size > self.max_size || self.max_entries == 0 {
            debug!("not caching {} ({} bytes exceeds limits)", key, entry_size);
            return;
        }

        let mut entries = self.write();
        Self::evict_key(&mut entries, key);

        while !entries.order.is_empty()
            && (entries.size_bytes + entry_size > self.max_size
                || entries.by_key.len() >= self.max_entries)
        {
            if let Some(oldest) = entries.order.pop_front() {
                if let Some(evicted) = entries.by_key.remove(&oldest) {
                    entries.size_bytes -= evicted.len();
                    debug!("evicted {} ({} bytes)", oldest, evicted.len());
                }
            }
        }

        entries.size_bytes += entry_size;
        entries.order.push_back(key.to_string());
        entries.by_key.insert(key.to_string(), bytes);
    }

    fn evict_key(entries: &mut Entries, key: &str) -> bool {
        match entries.by_key.remove(key) {
            Some(old) => {
                entries.size_bytes -= old.len();
                entries.order.retain(|k| k != key);
                true
            }
            None => false,
        }
    }

    /// Remove an entry from cache
    pub fn remove(&self, key: &str) -> bool {
        Self::evict_key(&mut self.write(), key)
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        let mut entries = self.write();
        entries.by_key.clear();
        entries.order.clear();
        entries.size_bytes = 0;
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let entries = self.read();
        CacheStats {
            entries: entries.by_key.len(),
            size_bytes: entries.size_bytes,
            max_size_bytes: self.max_size,
        }
    }
}

impl Default for MemoryContentCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentCache for MemoryContentCache {
    async fn has(&self, key: &str) -> bool {
        self.read().by_key.contains_key(key)
    }

    async fn get(&self, key: &str) -> Option<Bytes> {
        self.read().by_key.get(key).cloned()
    }

    async fn set(&self, key: &str, bytes: Bytes) {
        self.insert(key, bytes);
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached entries
    pub entries: usize,
    /// Total size in bytes
    pub size_bytes: usize,
    /// Maximum cache size
    pub max_size_bytes: usize,
}
