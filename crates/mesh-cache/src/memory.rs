//! In-memory response cache.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use mesh_path::Path;

use crate::{CacheScope, ResponseCache};

/// Entries belonging to one index generation.
#[derive(Default)]
struct Table {
    generation: u64,
    entries: RwLock<HashMap<Path, Arc<[u8]>>>,
}

/// Process-wide in-memory [`ResponseCache`].
///
/// Holds one table per index generation. The first operation carrying a
/// newer generation swaps in a fresh empty table; operations carrying an
/// older generation (requests still running against a superseded snapshot)
/// miss and store nothing, so stale renders never leak into the new table.
#[derive(Default)]
pub struct MemoryCache {
    table: RwLock<Arc<Table>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for `generation`, replacing the current one if it is older.
    fn table_for(&self, generation: u64) -> Option<Arc<Table>> {
        let current = Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner));
        if current.generation == generation {
            return Some(current);
        }
        if generation < current.generation {
            return None;
        }

        let mut slot = self.table.write().unwrap_or_else(PoisonError::into_inner);
        // Double-check after acquiring the write lock
        if slot.generation < generation {
            tracing::debug!(
                from = slot.generation,
                to = generation,
                "Replacing memory cache table"
            );
            *slot = Arc::new(Table {
                generation,
                entries: RwLock::default(),
            });
        }
        (slot.generation == generation).then(|| Arc::clone(&slot))
    }

    /// Number of entries in the current table.
    #[must_use]
    pub fn len(&self) -> usize {
        let table = Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner));
        let entries = table.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    /// True when the current table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, path: &Path, scope: &CacheScope) -> Option<Arc<[u8]>> {
        let table = self.table_for(scope.generation)?;
        let entries = table.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(path).map(Arc::clone)
    }

    fn put(&self, path: &Path, scope: &CacheScope, gzipped: &[u8]) {
        let Some(table) = self.table_for(scope.generation) else {
            tracing::debug!(path = %path, "Dropping render from superseded index");
            return;
        };
        let mut entries = table.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(path.clone(), Arc::from(gzipped));
    }

    fn remove(&self, path: &Path) {
        let table = Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner));
        let mut entries = table.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(path);
    }
}
