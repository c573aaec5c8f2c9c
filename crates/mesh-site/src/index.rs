//! Immutable site index snapshot.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use mesh_path::Path;

use crate::locale::Language;
use crate::record::PageRecord;
use crate::redirect::RedirectIndex;
use crate::settings::SiteSettings;

/// Result of one crawl pass.
///
/// Never mutated after publication, apart from the obsolete flag, the lazily
/// built redirect index and the shared hit counters of its records.
pub struct SiteIndex {
    pub(crate) generation: u64,
    pub(crate) built_at: SystemTime,
    pub(crate) pages: BTreeMap<Path, Arc<PageRecord>>,
    pub(crate) ranked: Vec<Arc<PageRecord>>,
    pub(crate) welcomes: HashMap<Path, Path>,
    pub(crate) languages: Vec<Language>,
    pub(crate) settings: Arc<SiteSettings>,
    redirects: OnceLock<RedirectIndex>,
    obsolete: AtomicBool,
}

impl SiteIndex {
    pub(crate) fn new(
        built_at: SystemTime,
        pages: BTreeMap<Path, Arc<PageRecord>>,
        ranked: Vec<Arc<PageRecord>>,
        welcomes: HashMap<Path, Path>,
        languages: Vec<Language>,
        settings: Arc<SiteSettings>,
    ) -> Self {
        Self {
            generation: 0,
            built_at,
            pages,
            ranked,
            welcomes,
            languages,
            settings,
            redirects: OnceLock::new(),
            obsolete: AtomicBool::new(false),
        }
    }

    /// Index with no pages, built at the epoch.
    pub(crate) fn empty(settings: Arc<SiteSettings>) -> Self {
        Self::new(
            SystemTime::UNIX_EPOCH,
            BTreeMap::new(),
            Vec::new(),
            HashMap::new(),
            Vec::new(),
            settings,
        )
    }

    /// Sequence number of this snapshot; increases with every publication.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the crawl that produced this snapshot finished.
    #[must_use]
    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    /// Number of indexed pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True when no page was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Record for a path, accepting a welcome file for its directory.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Arc<PageRecord>> {
        self.pages
            .get(path)
            .or_else(|| self.pages.get(&self.path_in_menu(path)))
    }

    /// Logical path: a directory's current welcome file maps to the
    /// directory, anything else to itself.
    #[must_use]
    pub fn path_in_menu(&self, path: &Path) -> Path {
        if path.is_root() {
            return path.clone();
        }
        let dir = path.parent();
        if self.welcomes.get(&dir) == Some(path) {
            dir
        } else {
            path.clone()
        }
    }

    /// Welcome file chosen for a directory during the crawl.
    #[must_use]
    pub fn current_welcome(&self, dir: &Path) -> Option<&Path> {
        self.welcomes.get(dir)
    }

    /// True when `path` is the welcome file of its directory.
    #[must_use]
    pub fn is_current_welcome(&self, path: &Path) -> bool {
        !path.is_root() && self.welcomes.get(&path.parent()) == Some(path)
    }

    /// File to serve for a logical path: the welcome file for directories.
    #[must_use]
    pub fn served_path(&self, path: &Path) -> Path {
        self.welcomes
            .get(path)
            .cloned()
            .unwrap_or_else(|| path.clone())
    }

    /// `root` and every page below it, in path order.
    pub fn pages_under(&self, root: &Path) -> impl Iterator<Item = &Arc<PageRecord>> {
        let upper = root.successor().map_or(Bound::Unbounded, Bound::Excluded);
        self.pages
            .range((Bound::Included(root.clone()), upper))
            .map(|(_, record)| record)
    }

    /// Pages exactly one level below `path`, in path order.
    #[must_use]
    pub fn children(&self, path: &Path) -> Vec<&Arc<PageRecord>> {
        self.pages_under(path)
            .filter(|record| record.path.is_child_of(path))
            .collect()
    }

    /// True when at least one page lives below `path`.
    #[must_use]
    pub fn has_children(&self, path: &Path) -> bool {
        self.pages_under(path).any(|record| record.path != *path)
    }

    /// All pages in ranking order.
    #[must_use]
    pub fn ranked(&self) -> &[Arc<PageRecord>] {
        &self.ranked
    }

    /// Pages at or below `root`, in ranking order.
    #[must_use]
    pub fn ranked_under(&self, root: &Path) -> Vec<&Arc<PageRecord>> {
        self.ranked
            .iter()
            .filter(|record| record.path.is_contained_in(root))
            .collect()
    }

    /// Indexed ancestors of `path`, root first, excluding `path` itself.
    #[must_use]
    pub fn breadcrumbs(&self, path: &Path) -> Vec<&Arc<PageRecord>> {
        let path = self.path_in_menu(path);
        (0..path.element_count())
            .filter_map(|depth| self.pages.get(&path.partial(depth)))
            .collect()
    }

    /// Language roots, in ranking order.
    #[must_use]
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// Counterpart of `path` in the tree of `language`.
    ///
    /// Swaps the first segment for the language code when the result is an
    /// indexed page, and falls back to the language root otherwise.
    #[must_use]
    pub fn corresponding_path(&self, path: &Path, language: &Language) -> Path {
        path.replace(0, &language.code)
            .ok()
            .filter(|candidate| self.get(candidate).is_some())
            .unwrap_or_else(|| language.path.clone())
    }

    /// Indexed page that most likely replaced a missing `path`.
    #[must_use]
    pub fn redirect_match(&self, path: &Path) -> Option<Path> {
        self.redirects
            .get_or_init(|| {
                RedirectIndex::build(self.ranked.iter().map(|record| &record.path), &self.settings)
            })
            .find(path, &self.settings)
    }

    /// True once a newer build has superseded this snapshot.
    #[must_use]
    pub fn is_obsolete(&self) -> bool {
        self.obsolete.load(Ordering::Acquire)
    }

    pub(crate) fn mark_obsolete(&self) {
        self.obsolete.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for SiteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteIndex")
            .field("generation", &self.generation)
            .field("built_at", &self.built_at)
            .field("pages", &self.pages.len())
            .field("obsolete", &self.is_obsolete())
            .finish_non_exhaustive()
    }
}
