//! Response cache tiers for Mesh.
//!
//! Rendered pages are cached gzip-compressed and keyed by served
//! [`Path`]. Every lookup and store carries a [`CacheScope`] describing the
//! site index snapshot the request resolved against, which is how entries
//! are invalidated when the index is rebuilt:
//!
//! - [`NullCache`]: never stores anything
//! - [`MemoryCache`]: process memory, one table per index generation
//! - [`DiskCache`]: one gzip file per path and index generation, fresh only
//!   if written after that index was built
//! - [`HybridCache`]: [`DiskCache`] with a bounded in-memory front
//!
//! Cache I/O failures never propagate: a failed read is a miss and a failed
//! write is dropped with a log line.
//!
//! # Example
//!
//! ```
//! use std::time::SystemTime;
//! use mesh_cache::{CacheScope, MemoryCache, ResponseCache};
//! use mesh_path::Path;
//!
//! let cache = MemoryCache::new();
//! let scope = CacheScope::new(1, SystemTime::now());
//! let page = Path::new("news/index.html");
//!
//! cache.put(&page, &scope, b"gzip bytes");
//! assert!(cache.get(&page, &scope).is_some());
//!
//! // A newer index generation starts from an empty table.
//! assert!(cache.get(&page, &CacheScope::new(2, SystemTime::now())).is_none());
//! ```

mod atomic;
mod disk;
pub mod gzip;
mod hybrid;
mod janitor;
mod memory;

use std::sync::Arc;
use std::time::SystemTime;

use mesh_path::Path;

pub use atomic::{TEMP_PREFIX, write_atomic};
pub use disk::{DiskCache, PAYLOAD_PREFIX};
pub use hybrid::HybridCache;
pub use janitor::{Janitor, JanitorReport};
pub use memory::MemoryCache;

/// Index snapshot a cache operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheScope {
    /// Monotonic generation number of the snapshot.
    pub generation: u64,
    /// When the snapshot finished building.
    pub built_at: SystemTime,
}

impl CacheScope {
    /// Create a scope.
    #[must_use]
    pub fn new(generation: u64, built_at: SystemTime) -> Self {
        Self {
            generation,
            built_at,
        }
    }
}

/// Storage for gzip-compressed rendered pages.
///
/// Payloads are opaque bytes. A stored payload is either fully visible to
/// readers or not visible at all.
pub trait ResponseCache: Send + Sync {
    /// Payload stored for `path`, if present and valid for `scope`.
    fn get(&self, path: &Path, scope: &CacheScope) -> Option<Arc<[u8]>>;

    /// Store a payload for `path`, replacing any previous one.
    fn put(&self, path: &Path, scope: &CacheScope, gzipped: &[u8]);

    /// Drop the payload for `path` in every tier.
    fn remove(&self, path: &Path);
}

/// No-op [`ResponseCache`] that always misses.
pub struct NullCache;

impl ResponseCache for NullCache {
    fn get(&self, _path: &Path, _scope: &CacheScope) -> Option<Arc<[u8]>> {
        None
    }

    fn put(&self, _path: &Path, _scope: &CacheScope, _gzipped: &[u8]) {}

    fn remove(&self, _path: &Path) {}
}
