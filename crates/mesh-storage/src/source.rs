//! Content source trait and error types.
//!
//! All path parameters are **site paths** ([`mesh_path::Path`]), never
//! filesystem paths. Implementations map them onto their own storage.

use std::time::SystemTime;

use mesh_path::Path;

/// Kind of a content entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Result of [`ContentSource::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    /// File or directory.
    pub kind: EntryKind,
    /// Last modification time.
    pub modified: SystemTime,
}

impl EntryStat {
    /// True for directories.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// True for regular files.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (a single path segment).
    pub name: String,
    /// Kind and modification time.
    pub stat: EntryStat,
}

/// Metadata extracted from a page source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSource {
    /// Declared title, if any.
    pub title: Option<String>,
    /// Raw keywords field, if any.
    pub keywords: Option<String>,
    /// Body as plain text with markup removed.
    pub body_text: String,
}

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Resource does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Path escapes the content root.
    InvalidPath,
    /// Other/unknown error category.
    Other,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    /// Semantic error category.
    pub kind: StorageErrorKind,
    /// Site path context (if applicable).
    pub path: Option<Path>,
    /// Backend identifier (e.g., "Fs", "Mock").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.clone());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a not found error with path.
    #[must_use]
    pub fn not_found(path: &Path) -> Self {
        Self::new(StorageErrorKind::NotFound).with_path(path)
    }

    /// Create an invalid path error.
    #[must_use]
    pub fn invalid_path(path: &Path) -> Self {
        Self::new(StorageErrorKind::InvalidPath).with_path(path)
    }

    /// Create a storage error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, path: &Path) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            _ => StorageErrorKind::Other,
        };
        Self::new(kind).with_source(err).with_path(path)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (path: /foo/bar)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::PermissionDenied => "Permission denied",
            StorageErrorKind::InvalidPath => "Invalid path",
            StorageErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(path) = &self.path {
            write!(f, " (path: /{path})")?;
        }

        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Read access to the content tree.
pub trait ContentSource: Send + Sync {
    /// Kind and modification time of the entry at `path`.
    ///
    /// Returns `None` when the entry does not exist or cannot be inspected.
    fn stat(&self, path: &Path) -> Option<EntryStat>;

    /// Entries of the directory at `path`, in unspecified order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if `path` is not a readable directory.
    fn list(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError>;

    /// Raw bytes of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file doesn't exist or can't be read.
    fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError>;

    /// Title, keywords and plain-text body of the page at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file doesn't exist or can't be read.
    fn read_metadata(&self, path: &Path) -> Result<PageSource, StorageError>;

    /// Check if an entry exists at `path`.
    fn exists(&self, path: &Path) -> bool {
        self.stat(path).is_some()
    }
}
