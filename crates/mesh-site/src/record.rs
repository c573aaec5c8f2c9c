//! Indexed page metadata.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use mesh_path::Path;
use mesh_storage::PageSource;

use crate::stats::PageStats;

/// Metadata of one indexed page.
///
/// Immutable once published in a snapshot, apart from the shared
/// [`PageStats`] counters.
#[derive(Debug)]
pub struct PageRecord {
    /// Logical path: the directory for welcome files, the file otherwise.
    pub path: Path,
    /// File the record was built from.
    pub source: Path,
    /// Page title, or a name derived from the path.
    pub title: String,
    /// Source modification time. The epoch when the page failed to parse.
    pub last_modified: SystemTime,
    /// Keywords from the page's `keywords` meta tag.
    pub keywords: Vec<String>,
    /// Plain-text start of the page body.
    pub excerpt: String,
    /// Hit counters, shared with the previous snapshot's record.
    pub stats: Arc<PageStats>,
}

impl PageRecord {
    /// Build a record from parsed page metadata.
    #[must_use]
    pub fn from_source(
        path: Path,
        source: Path,
        modified: SystemTime,
        page: PageSource,
        excerpt_length: usize,
        stats: Arc<PageStats>,
    ) -> Self {
        let title = page
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| fallback_title(&path, &source));
        Self {
            title,
            last_modified: modified,
            keywords: page.keywords.as_deref().map(split_keywords).unwrap_or_default(),
            excerpt: excerpt(&page.body_text, excerpt_length),
            path,
            source,
            stats,
        }
    }

    /// Build a placeholder record for a page that could not be parsed.
    ///
    /// The epoch modification time makes the next crawl parse it again.
    #[must_use]
    pub fn unparsed(path: Path, source: Path, stats: Arc<PageStats>) -> Self {
        Self {
            title: fallback_title(&path, &source),
            last_modified: UNIX_EPOCH,
            keywords: Vec::new(),
            excerpt: String::new(),
            path,
            source,
            stats,
        }
    }

    /// True when this record stands for a directory's welcome file.
    #[must_use]
    pub fn is_welcome(&self) -> bool {
        self.path != self.source
    }
}

fn fallback_title(path: &Path, source: &Path) -> String {
    let name = if path.is_root() { source.last() } else { path.last() };
    humanize(name)
}

/// Human-readable title from a file or directory name.
///
/// Drops the extension, splits on `-`, `_` and spaces, and capitalizes each
/// word: `"my-first_page.html"` becomes `"My First Page"`.
pub(crate) fn humanize(name: &str) -> String {
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    let mut result = String::with_capacity(stem.len());
    for word in stem.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}

/// Comma-separated keywords, trimmed, empty entries dropped.
pub(crate) fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_owned)
        .collect()
}

/// At most `limit` characters of `text`, ending in `" ..."` when cut.
pub(crate) fn excerpt(text: &str, limit: usize) -> String {
    if limit == 0 {
        return String::new();
    }
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    if limit < 5 {
        return "...".to_owned();
    }
    let mut cut: String = text.chars().take(limit - 4).collect();
    cut.push_str(" ...");
    cut
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::SystemClock;

    fn stats() -> Arc<PageStats> {
        Arc::new(PageStats::new(Arc::new(SystemClock), 7))
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("my-first_page.html"), "My First Page");
        assert_eq!(humanize("news"), "News");
        assert_eq!(humanize("index.html"), "Index");
        assert_eq!(humanize("über-uns.htm"), "Über Uns");
        assert_eq!(humanize("--"), "");
        assert_eq!(humanize(".hidden"), ".hidden");
    }

    #[test]
    fn test_split_keywords() {
        assert_eq!(
            split_keywords(" rust, web ,,caching systems , "),
            vec!["rust", "web", "caching systems"]
        );
        assert!(split_keywords(" , ").is_empty());
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 300), "short");
        assert_eq!(excerpt("exactly", 7), "exactly");
        assert_eq!(excerpt("hello world", 9), "hello ...");
        assert_eq!(excerpt("hello world", 4), "...");
        assert_eq!(excerpt("hello world", 0), "");
        assert_eq!(excerpt("äöüäöüäöü", 6), "äö ...");
    }

    #[test]
    fn test_from_source() {
        let page = PageSource {
            title: Some("News".to_owned()),
            keywords: Some("a, b".to_owned()),
            body_text: "Latest news from the site".to_owned(),
        };
        let modified = UNIX_EPOCH + std::time::Duration::from_secs(100);

        let record = PageRecord::from_source(
            Path::new("news"),
            Path::new("news/index.html"),
            modified,
            page,
            10,
            stats(),
        );

        assert_eq!(record.title, "News");
        assert_eq!(record.keywords, vec!["a", "b"]);
        assert_eq!(record.excerpt, "Latest ...");
        assert_eq!(record.last_modified, modified);
        assert!(record.is_welcome());
    }

    #[test]
    fn test_from_source_without_title() {
        let page = PageSource {
            title: Some("  ".to_owned()),
            keywords: None,
            body_text: String::new(),
        };

        let record = PageRecord::from_source(
            Path::new("news/2020-results.html"),
            Path::new("news/2020-results.html"),
            UNIX_EPOCH,
            page,
            300,
            stats(),
        );

        assert_eq!(record.title, "2020 Results");
        assert!(record.keywords.is_empty());
        assert!(!record.is_welcome());
    }

    #[test]
    fn test_unparsed_root() {
        let record = PageRecord::unparsed(Path::root(), Path::new("index.html"), stats());

        assert_eq!(record.title, "Index");
        assert_eq!(record.last_modified, UNIX_EPOCH);
    }
}
