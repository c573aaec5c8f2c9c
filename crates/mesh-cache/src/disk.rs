//! File-based response cache.
//!
//! [`DiskCache`] stores each payload as a gzip file in a directory tree that
//! mirrors the site, one file per index generation:
//!
//! ```text
//! {root}/
//! +-- VERSION                    # cache layout version
//! +-- index.html/_cache-3.gz     # served path "index.html", generation 3
//! +-- news/
//!     +-- index.html/_cache-3.gz # served path "news/index.html"
//! ```
//!
//! A payload is valid only for the generation in its name, and only if its
//! file was modified after that index was built. The second check covers
//! restarts, where generation numbers begin again. Files of older
//! generations are ignored, not deleted; the [`Janitor`](crate::Janitor)
//! removes them eventually.
//!
//! Renders finishing after a newer generation was seen are dropped, so a
//! superseded index never writes into the cache.
//!
//! When the `VERSION` file is missing or names another layout, payload and
//! temporary files below the root are purged. Anything else in the
//! directory is left alone.

use std::fs;
use std::io;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mesh_path::Path;
use mesh_storage::{Descend, EntryStat, FsSource, TreeVisitor, walk};

use crate::atomic::{TEMP_PREFIX, write_atomic};
use crate::{CacheScope, ResponseCache, gzip};

/// File name prefix of payload files inside each path's cache directory.
pub const PAYLOAD_PREFIX: &str = "_cache";

/// Version of the on-disk layout.
const LAYOUT_VERSION: &str = "mesh-cache-2";

const VERSION_FILE: &str = "VERSION";

/// On-disk [`ResponseCache`] rooted at a directory.
pub struct DiskCache {
    root: PathBuf,
    /// Highest index generation seen by any operation.
    latest: AtomicU64,
}

impl DiskCache {
    /// Create a cache at `root`, checking the layout version.
    ///
    /// Errors while preparing the directory are logged but never fatal.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        prepare_root(&root);
        Self {
            root,
            latest: AtomicU64::new(0),
        }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &FsPath {
        &self.root
    }

    /// Payload file for a served path and generation, or `None` for
    /// escaping paths.
    #[must_use]
    pub fn payload_path(&self, path: &Path, generation: u64) -> Option<PathBuf> {
        path.to_fs_path(&self.root)
            .map(|dir| dir.join(payload_name(generation)))
    }

    /// Store a payload, returning whether it reached the disk.
    ///
    /// Nothing is written for escaping paths or for a generation older than
    /// one already seen.
    pub fn store(&self, path: &Path, scope: &CacheScope, gzipped: &[u8]) -> bool {
        if !self.observe(scope.generation) {
            tracing::debug!(path = %path, generation = scope.generation, "Dropping render from superseded index");
            return false;
        }
        let Some(file) = self.payload_path(path, scope.generation) else {
            return false;
        };
        match write_atomic(&file, gzipped) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Failed to write cache file");
                false
            }
        }
    }

    /// Record `generation`; false when a newer one was seen before.
    pub(crate) fn observe(&self, generation: u64) -> bool {
        self.latest.fetch_max(generation, Ordering::AcqRel) <= generation
    }
}

impl ResponseCache for DiskCache {
    fn get(&self, path: &Path, scope: &CacheScope) -> Option<Arc<[u8]>> {
        if !self.observe(scope.generation) {
            return None;
        }
        let file = self.payload_path(path, scope.generation)?;
        let modified = fs::metadata(&file).and_then(|m| m.modified()).ok()?;
        if modified <= scope.built_at {
            tracing::debug!(path = %path, "Ignoring cache file older than index");
            return None;
        }
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Failed to read cache file");
                return None;
            }
        };
        if !gzip::is_intact(&bytes) {
            tracing::warn!(file = %file.display(), "Removing corrupt cache file");
            remove_file(&file);
            return None;
        }
        Some(Arc::from(bytes))
    }

    fn put(&self, path: &Path, scope: &CacheScope, gzipped: &[u8]) {
        self.store(path, scope, gzipped);
    }

    fn remove(&self, path: &Path) {
        let Some(dir) = path.to_fs_path(&self.root) else {
            return;
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to list cache directory");
                return;
            }
        };
        for entry in entries.filter_map(Result::ok) {
            if is_payload_name(&entry.file_name().to_string_lossy()) {
                remove_file(&entry.path());
            }
        }
    }
}

fn payload_name(generation: u64) -> String {
    format!("{PAYLOAD_PREFIX}-{generation}.gz")
}

/// Payload files of any generation or layout version.
fn is_payload_name(name: &str) -> bool {
    name.starts_with(PAYLOAD_PREFIX)
        && FsPath::new(name)
            .extension()
            .is_some_and(|ext| ext == "gz")
}

fn remove_file(file: &FsPath) {
    match fs::remove_file(file) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(file = %file.display(), error = %e, "Failed to remove cache file");
        }
    }
}

/// Make `root` a cache directory of the current layout.
fn prepare_root(root: &FsPath) {
    let version_file = root.join(VERSION_FILE);
    match fs::read_to_string(&version_file) {
        Ok(stored) if stored.trim() == LAYOUT_VERSION => return,
        Ok(stored) => tracing::info!(
            stored = stored.trim(),
            current = LAYOUT_VERSION,
            "Cache layout changed, purging cached pages"
        ),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(root = %root.display(), "Initializing cache directory");
        }
        Err(e) => {
            tracing::warn!(file = %version_file.display(), error = %e, "Failed to read cache version");
            return;
        }
    }

    let purged = purge(root);
    if purged > 0 {
        tracing::info!(root = %root.display(), files = purged, "Purged cache files");
    }
    if let Err(e) = write_atomic(&version_file, LAYOUT_VERSION.as_bytes()) {
        tracing::warn!(file = %version_file.display(), error = %e, "Failed to write cache version");
    }
}

/// Delete payload and temporary files below `root`, then the directories
/// they leave empty. Returns the number of files removed.
fn purge(root: &FsPath) -> usize {
    let source = FsSource::new(root.to_path_buf());
    let mut purge = Purge {
        source: &source,
        removed: 0,
    };
    walk(&source, &Path::root(), &mut purge);
    purge.removed
}

struct Purge<'a> {
    source: &'a FsSource,
    removed: usize,
}

impl TreeVisitor for Purge<'_> {
    fn enter_directory(&mut self, _path: &Path, _stat: &EntryStat) -> Descend {
        Descend::Continue
    }

    fn visit_file(&mut self, path: &Path, _stat: &EntryStat) {
        let name = path.last();
        if !is_payload_name(name) && !name.starts_with(TEMP_PREFIX) {
            return;
        }
        if let Some(file) = self.source.resolve(path)
            && fs::remove_file(&file).is_ok()
        {
            self.removed += 1;
        }
    }

    fn leave_directory(&mut self, path: &Path) {
        if path.is_root() {
            return;
        }
        // Only succeeds for directories emptied above.
        if let Some(dir) = self.source.resolve(path) {
            let _ = fs::remove_dir(dir);
        }
    }
}
