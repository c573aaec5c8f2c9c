//! Filesystem content source.

use std::fs;
use std::path::PathBuf;

use mesh_path::Path;

use crate::html::extract_page_source;
use crate::source::{ContentSource, DirEntry, EntryKind, EntryStat, PageSource, StorageError};

const BACKEND: &str = "Fs";

/// Content source rooted at a directory on disk.
///
/// Site paths map onto the directory tree below `root`. Relative (escaping)
/// paths are rejected. Symbolic links are followed for files but never
/// descended into as directories, so a link cycle cannot trap a walk.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Create a source rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Filesystem location of a site path, or `None` if it escapes the root.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> Option<PathBuf> {
        path.to_fs_path(&self.root)
    }

    fn resolve_or_err(&self, path: &Path) -> Result<PathBuf, StorageError> {
        self.resolve(path)
            .ok_or_else(|| StorageError::invalid_path(path).with_backend(BACKEND))
    }
}

fn stat_from_metadata(metadata: &fs::Metadata) -> Option<EntryStat> {
    let kind = if metadata.is_dir() {
        EntryKind::Directory
    } else if metadata.is_file() {
        EntryKind::File
    } else {
        return None;
    };
    let modified = metadata.modified().ok()?;
    Some(EntryStat { kind, modified })
}

impl ContentSource for FsSource {
    fn stat(&self, path: &Path) -> Option<EntryStat> {
        let fs_path = self.resolve(path)?;
        let metadata = fs::metadata(fs_path).ok()?;
        stat_from_metadata(&metadata)
    }

    fn list(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let dir = self.resolve_or_err(path)?;
        let read_dir =
            fs::read_dir(&dir).map_err(|e| StorageError::io(e, path).with_backend(BACKEND))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(dir = %dir.display(), "Skipping non UTF-8 file name");
                continue;
            };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let metadata = if file_type.is_symlink() {
                match fs::metadata(entry.path()) {
                    Ok(target) if target.is_file() => target,
                    _ => continue,
                }
            } else {
                match entry.metadata() {
                    Ok(metadata) => metadata,
                    Err(_) => continue,
                }
            };
            if let Some(stat) = stat_from_metadata(&metadata) {
                entries.push(DirEntry { name, stat });
            }
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        let file = self.resolve_or_err(path)?;
        fs::read(file).map_err(|e| StorageError::io(e, path).with_backend(BACKEND))
    }

    fn read_metadata(&self, path: &Path) -> Result<PageSource, StorageError> {
        let bytes = self.read(path)?;
        Ok(extract_page_source(&String::from_utf8_lossy(&bytes)))
    }
}
