//! Content source abstraction for Mesh.
//!
//! The site index never touches the filesystem directly. It asks a
//! [`ContentSource`] for entry metadata, directory listings and page
//! metadata, addressed by site [`Path`](mesh_path::Path).
//!
//! # Architecture
//!
//! - [`ContentSource`] trait with `stat()`, `list()`, `read()` and
//!   `read_metadata()`
//! - [`FsSource`] for a content directory on disk
//! - [`walk`] for depth-first traversal with enter/visit/leave callbacks
//! - [`MockSource`] for testing (behind `mock` feature flag)

mod fs;
mod html;
#[cfg(feature = "mock")]
mod mock;
mod source;
mod walk;

pub use fs::FsSource;
pub use html::extract_page_source;
#[cfg(feature = "mock")]
pub use mock::MockSource;
pub use source::{
    ContentSource, DirEntry, EntryKind, EntryStat, PageSource, StorageError, StorageErrorKind,
};
pub use walk::{Descend, TreeVisitor, walk};
