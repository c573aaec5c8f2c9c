//! Disk cache with a bounded in-memory front.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use mesh_path::Path;

use crate::disk::DiskCache;
use crate::{CacheScope, ResponseCache};

/// [`DiskCache`] fronted by a least-recently-used memory tier.
///
/// Disk stays authoritative. The memory front only holds payloads that were
/// read from or successfully written to disk, tagged with their index
/// generation, and evicts the least recently used entry once `capacity` is
/// reached.
pub struct HybridCache {
    disk: DiskCache,
    front: Mutex<LruCache<Path, (u64, Arc<[u8]>)>>,
}

impl HybridCache {
    /// Create a hybrid cache over the disk cache at `root`.
    #[must_use]
    pub fn new(root: PathBuf, capacity: NonZeroUsize) -> Self {
        Self {
            disk: DiskCache::new(root),
            front: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn promote(&self, path: &Path, generation: u64, payload: &Arc<[u8]>) {
        let mut front = self.front.lock().unwrap_or_else(PoisonError::into_inner);
        front.put(path.clone(), (generation, Arc::clone(payload)));
    }
}

impl ResponseCache for HybridCache {
    fn get(&self, path: &Path, scope: &CacheScope) -> Option<Arc<[u8]>> {
        if !self.disk.observe(scope.generation) {
            return None;
        }
        {
            let mut front = self.front.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((generation, payload)) = front.get(path)
                && *generation == scope.generation
            {
                return Some(Arc::clone(payload));
            }
        }

        let payload = self.disk.get(path, scope)?;
        tracing::debug!(path = %path, "Promoting disk cache hit to memory");
        self.promote(path, scope.generation, &payload);
        Some(payload)
    }

    fn put(&self, path: &Path, scope: &CacheScope, gzipped: &[u8]) {
        if self.disk.store(path, scope, gzipped) {
            self.promote(path, scope.generation, &Arc::from(gzipped));
        }
    }

    fn remove(&self, path: &Path) {
        self.front
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(path);
        self.disk.remove(path);
    }
}
