//! Site path algebra for Mesh.
//!
//! A [`Path`] is an immutable, normalized sequence of segments. It is the key
//! type for every site-level collection: the page index, the response cache
//! and the redirect index all address content by `Path`.
//!
//! # Normalization
//!
//! Inputs are split on `/` and `\`. Empty and `.` segments are dropped, and
//! `..` cancels the preceding segment unless that segment is itself `..`.
//! A `..` that cannot be cancelled stays at the front and marks the path as
//! relative (escaping its root):
//!
//! ```
//! use mesh_path::Path;
//!
//! let path = Path::new("docs/./guide//../intro.html");
//! assert_eq!(path.to_string(), "docs/intro.html");
//!
//! let escaping = Path::new("../outside");
//! assert!(escaping.is_relative());
//! ```
//!
//! # Ordering
//!
//! Paths compare segment by segment, so a path always sorts before its
//! descendants, and `[path, path.successor())` is exactly the subtree of
//! `path` in any ordered map keyed by `Path`.

mod path;

pub use path::{IntoSegments, Path, PathError};
