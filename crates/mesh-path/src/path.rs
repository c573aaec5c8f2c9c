//! The [`Path`] value type.

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const PARENT: &str = "..";
const CURRENT: &str = ".";

/// Error returned by [`Path::replace`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Segment index is outside the path.
    #[error("segment index {index} out of range for path with {len} segments")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of segments in the path.
        len: usize,
    },
    /// Replacement value is empty.
    #[error("replacement segment is empty")]
    EmptySegment,
}

/// Anything that can be tokenized into raw path segments.
///
/// Strings are split on `/` and `\`, nested paths contribute their segments
/// and collections contribute each element in order. Normalization happens
/// once all parts are collected, so `..` in a later part cancels segments
/// from an earlier one.
pub trait IntoSegments {
    /// Append raw (not yet normalized) segments to `out`.
    fn push_segments(self, out: &mut Vec<String>);
}

impl IntoSegments for &str {
    fn push_segments(self, out: &mut Vec<String>) {
        out.extend(self.split(['/', '\\']).map(str::to_owned));
    }
}

impl IntoSegments for String {
    fn push_segments(self, out: &mut Vec<String>) {
        self.as_str().push_segments(out);
    }
}

impl IntoSegments for &String {
    fn push_segments(self, out: &mut Vec<String>) {
        self.as_str().push_segments(out);
    }
}

impl IntoSegments for &Path {
    fn push_segments(self, out: &mut Vec<String>) {
        out.extend(self.segments.iter().cloned());
    }
}

impl IntoSegments for Path {
    fn push_segments(self, out: &mut Vec<String>) {
        (&self).push_segments(out);
    }
}

impl<T: IntoSegments> IntoSegments for Option<T> {
    fn push_segments(self, out: &mut Vec<String>) {
        if let Some(part) = self {
            part.push_segments(out);
        }
    }
}

impl<T: IntoSegments> IntoSegments for Vec<T> {
    fn push_segments(self, out: &mut Vec<String>) {
        for part in self {
            part.push_segments(out);
        }
    }
}

impl<T: IntoSegments, const N: usize> IntoSegments for [T; N] {
    fn push_segments(self, out: &mut Vec<String>) {
        for part in self {
            part.push_segments(out);
        }
    }
}

impl<'a, T> IntoSegments for &'a [T]
where
    &'a T: IntoSegments,
{
    fn push_segments(self, out: &mut Vec<String>) {
        for part in self {
            part.push_segments(out);
        }
    }
}

impl<A: IntoSegments, B: IntoSegments> IntoSegments for (A, B) {
    fn push_segments(self, out: &mut Vec<String>) {
        self.0.push_segments(out);
        self.1.push_segments(out);
    }
}

impl<A: IntoSegments, B: IntoSegments, C: IntoSegments> IntoSegments for (A, B, C) {
    fn push_segments(self, out: &mut Vec<String>) {
        self.0.push_segments(out);
        self.1.push_segments(out);
        self.2.push_segments(out);
    }
}

/// Immutable, normalized site path.
///
/// Equality, hashing and ordering derive from the segment sequence only.
/// Cloning is cheap: segments live behind an `Arc`.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    segments: Arc<[String]>,
}

impl Path {
    /// Build a path from one or more parts.
    ///
    /// Never fails: malformed input just yields fewer segments.
    #[must_use]
    pub fn new(parts: impl IntoSegments) -> Self {
        let mut raw = Vec::new();
        parts.push_segments(&mut raw);
        Self::from_raw(raw)
    }

    /// The root path (zero segments).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    fn from_raw(raw: Vec<String>) -> Self {
        let mut segments: Vec<String> = Vec::with_capacity(raw.len());
        for segment in raw {
            match segment.as_str() {
                "" | CURRENT => {}
                PARENT if segments.last().is_some_and(|last| last != PARENT) => {
                    segments.pop();
                }
                _ => segments.push(segment),
            }
        }
        Self {
            segments: segments.into(),
        }
    }

    /// True when the path has no segments.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when the path escapes its root (starts with `..`).
    #[must_use]
    pub fn is_relative(&self) -> bool {
        self.segments.first().is_some_and(|first| first == PARENT)
    }

    /// Number of segments.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.segments.len()
    }

    /// All segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segment at `index`, if any.
    #[must_use]
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// Last segment, or `""` for the root.
    #[must_use]
    pub fn last(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Append parts to this path and normalize the result.
    #[must_use]
    pub fn add(&self, parts: impl IntoSegments) -> Self {
        let mut raw = self.segments.to_vec();
        parts.push_segments(&mut raw);
        Self::from_raw(raw)
    }

    /// Parent path. The parent of the root is `..`.
    #[must_use]
    pub fn parent(&self) -> Self {
        self.add(PARENT)
    }

    /// First `n` segments; the root for `n == 0`, `self` for `n >= len`.
    #[must_use]
    pub fn partial(&self, n: usize) -> Self {
        if n >= self.segments.len() {
            return self.clone();
        }
        Self {
            segments: self.segments[..n].into(),
        }
    }

    /// Express this path relative to `root`.
    ///
    /// Walks the common prefix, emits one `..` per remaining `root` segment,
    /// then the remaining own segments. The result is relative exactly when
    /// `root` is not an ancestor of (or equal to) this path.
    #[must_use]
    pub fn relative_to(&self, root: &Path) -> Self {
        let common = self.common_len(root);
        let ups = std::iter::repeat_n(PARENT.to_owned(), root.segments.len() - common);
        let rest = self.segments[common..].iter().cloned();
        Self::from_raw(ups.chain(rest).collect())
    }

    /// True when `root` is this path or one of its ancestors.
    #[must_use]
    pub fn is_contained_in(&self, root: &Path) -> bool {
        !self.relative_to(root).is_relative()
    }

    /// True when this path sits exactly one segment below `root`.
    #[must_use]
    pub fn is_child_of(&self, root: &Path) -> bool {
        self.segments.len() == root.segments.len() + 1 && self.is_contained_in(root)
    }

    /// Longest common leading part of two paths.
    #[must_use]
    pub fn common_path(&self, other: &Path) -> Self {
        self.partial(self.common_len(other))
    }

    fn common_len(&self, other: &Path) -> usize {
        self.segments
            .iter()
            .zip(other.segments.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Smallest path that sorts after every descendant of this path.
    ///
    /// Use it as the exclusive upper bound of a range query over an ordered
    /// map. Every path is a descendant of the root, so the root has no
    /// successor.
    #[must_use]
    pub fn successor(&self) -> Option<Self> {
        let last = self.segments.last()?;
        let mut segments = self.segments.to_vec();
        let end = segments.len() - 1;
        segments[end] = format!("{last}\0");
        Some(Self {
            segments: segments.into(),
        })
    }

    /// Replace the segment at `index` with `value`.
    ///
    /// `value` is tokenized like any other input, so it may expand into
    /// several segments.
    pub fn replace(&self, index: usize, value: &str) -> Result<Self, PathError> {
        let len = self.segments.len();
        if index >= len {
            return Err(PathError::IndexOutOfRange { index, len });
        }
        if value.is_empty() {
            return Err(PathError::EmptySegment);
        }
        let mut raw = self.segments.to_vec();
        raw[index] = value.to_owned();
        Ok(Self::new(raw))
    }

    /// Link form: `/a/b` for absolute paths, `""` for the root, unchanged
    /// for relative ones.
    #[must_use]
    pub fn as_link(&self) -> String {
        if self.is_root() {
            String::new()
        } else if self.is_relative() {
            self.to_string()
        } else {
            format!("/{self}")
        }
    }

    /// Resolve against a filesystem directory.
    ///
    /// Returns `None` for relative paths, which would escape `base`.
    #[must_use]
    pub fn to_fs_path(&self, base: &std::path::Path) -> Option<PathBuf> {
        if self.is_relative() {
            return None;
        }
        let mut resolved = base.to_path_buf();
        resolved.extend(self.segments.iter());
        Some(resolved)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({:?})", self.to_string())
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Path {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Path {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}
