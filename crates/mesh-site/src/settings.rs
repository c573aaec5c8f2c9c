//! Indexing settings.

use std::time::Duration;

use mesh_path::Path;

/// Settings that shape how a site is crawled and indexed.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Welcome file names, in order of preference.
    pub welcome_files: Vec<String>,
    /// File extensions (without dot) that count as pages.
    pub page_extensions: Vec<String>,
    /// Maximum excerpt length in characters. Zero disables excerpts.
    pub excerpt_length: usize,
    /// Number of daily hit buckets kept per page.
    pub retention_days: usize,
    /// Minimum age of a snapshot before a background rebuild starts.
    pub rebuild_interval: Duration,
    /// First-level directories that are never indexed nor served.
    pub system_dirs: Vec<String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            welcome_files: vec!["index.html".to_owned(), "index.htm".to_owned()],
            page_extensions: vec!["html".to_owned(), "htm".to_owned()],
            excerpt_length: 300,
            retention_days: 30,
            rebuild_interval: Duration::from_secs(300),
            system_dirs: ["WEB-INF", "META-INF", "cgi-bin", "admin", "private"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

impl SiteSettings {
    /// True when `name` has one of the page extensions (case-insensitive).
    #[must_use]
    pub fn is_page(&self, name: &str) -> bool {
        extension(name).is_some_and(|ext| {
            self.page_extensions
                .iter()
                .any(|page| page.eq_ignore_ascii_case(ext))
        })
    }

    /// True when `name` is one of the welcome file names.
    #[must_use]
    pub fn is_welcome_name(&self, name: &str) -> bool {
        self.welcome_files.iter().any(|welcome| welcome == name)
    }

    /// True for paths that escape the root or live in a system directory.
    #[must_use]
    pub fn is_system(&self, path: &Path) -> bool {
        if path.is_relative() {
            return true;
        }
        path.segment(0).is_some_and(|first| {
            self.system_dirs
                .iter()
                .any(|dir| dir.eq_ignore_ascii_case(first))
        })
    }

    /// `name` without its extension when that extension marks a page.
    #[must_use]
    pub fn strip_page_extension<'a>(&self, name: &'a str) -> &'a str {
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() && self.is_page(name) => stem,
            _ => name,
        }
    }
}

/// Extension of a file name, ignoring leading dots.
pub(crate) fn extension(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}
