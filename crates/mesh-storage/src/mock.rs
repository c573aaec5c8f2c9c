//! Mock content source for testing.
//!
//! Provides [`MockSource`] for unit testing without filesystem access.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use mesh_path::Path;

use crate::html::extract_page_source;
use crate::source::{
    ContentSource, DirEntry, EntryKind, EntryStat, PageSource, StorageError, StorageErrorKind,
};

const BACKEND: &str = "Mock";

#[derive(Debug, Clone)]
struct MockFile {
    content: String,
    modified: SystemTime,
    unreadable: bool,
}

/// Mock content source for testing.
///
/// Stores files in memory. Directories exist implicitly as ancestors of
/// stored files or explicitly via [`MockSource::with_dir`]. Use the builder
/// methods to configure the mock with test data and [`MockSource::write`]
/// to change it between index builds.
///
/// # Example
///
/// ```ignore
/// use mesh_storage::{ContentSource, MockSource};
///
/// let source = MockSource::new()
///     .with_file("index.html", 100, "<title>Home</title>")
///     .with_file("news/index.html", 100, "<title>News</title>");
///
/// assert!(source.stat(&Path::new("news")).unwrap().is_dir());
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    files: RwLock<BTreeMap<Path, MockFile>>,
    dirs: RwLock<BTreeSet<Path>>,
}

fn time_from_secs(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

impl MockSource {
    /// Create a new empty mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with the given modification time (seconds since epoch).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_file(self, path: &str, mtime_secs: u64, content: impl Into<String>) -> Self {
        self.write(path, mtime_secs, content);
        self
    }

    /// Add a file whose reads always fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_unreadable_file(self, path: &str, mtime_secs: u64) -> Self {
        self.files.write().unwrap().insert(
            Path::new(path),
            MockFile {
                content: String::new(),
                modified: time_from_secs(mtime_secs),
                unreadable: true,
            },
        );
        self
    }

    /// Add an empty directory.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_dir(self, path: &str) -> Self {
        self.dirs.write().unwrap().insert(Path::new(path));
        self
    }

    /// Create or replace a file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn write(&self, path: &str, mtime_secs: u64, content: impl Into<String>) {
        self.files.write().unwrap().insert(
            Path::new(path),
            MockFile {
                content: content.into(),
                modified: time_from_secs(mtime_secs),
                unreadable: false,
            },
        );
    }

    /// Remove a file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove(&self, path: &str) {
        self.files.write().unwrap().remove(&Path::new(path));
    }

    fn is_dir(&self, path: &Path) -> bool {
        if path.is_root() || self.dirs.read().unwrap().contains(path) {
            return true;
        }
        let files = self.files.read().unwrap();
        files.keys().any(|file| file != path && file.is_contained_in(path))
    }

    fn dir_modified(&self, path: &Path) -> SystemTime {
        let files = self.files.read().unwrap();
        files
            .iter()
            .filter(|(file, _)| file.is_child_of(path))
            .map(|(_, f)| f.modified)
            .max()
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    fn file(&self, path: &Path) -> Result<MockFile, StorageError> {
        let file = self
            .files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::not_found(path).with_backend(BACKEND))?;
        if file.unreadable {
            return Err(StorageError::new(StorageErrorKind::PermissionDenied)
                .with_path(path)
                .with_backend(BACKEND));
        }
        Ok(file)
    }
}

impl ContentSource for MockSource {
    fn stat(&self, path: &Path) -> Option<EntryStat> {
        if let Some(file) = self.files.read().unwrap().get(path) {
            return Some(EntryStat {
                kind: EntryKind::File,
                modified: file.modified,
            });
        }
        self.is_dir(path).then(|| EntryStat {
            kind: EntryKind::Directory,
            modified: self.dir_modified(path),
        })
    }

    fn list(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        if !self.is_dir(path) {
            return Err(StorageError::not_found(path).with_backend(BACKEND));
        }

        let mut children: BTreeSet<Path> = BTreeSet::new();
        let files: Vec<Path> = self.files.read().unwrap().keys().cloned().collect();
        let dirs: Vec<Path> = self.dirs.read().unwrap().iter().cloned().collect();
        for entry in files.iter().chain(dirs.iter()) {
            if entry != path && entry.is_contained_in(path) {
                children.insert(entry.partial(path.element_count() + 1));
            }
        }

        Ok(children
            .into_iter()
            .filter_map(|child| {
                let stat = self.stat(&child)?;
                Some(DirEntry {
                    name: child.last().to_owned(),
                    stat,
                })
            })
            .collect())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        Ok(self.file(path)?.content.into_bytes())
    }

    fn read_metadata(&self, path: &Path) -> Result<PageSource, StorageError> {
        Ok(extract_page_source(&self.file(path)?.content))
    }
}
