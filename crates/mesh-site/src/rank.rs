//! Page ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use mesh_path::Path;

/// Site-wide page metadata consulted while ranking.
pub trait SiteInfo: Send + Sync {
    /// Explicit ranking score of a page. Higher ranks first.
    fn score(&self, _path: &Path) -> i32 {
        0
    }
}

/// [`SiteInfo`] backed by a fixed table of scores.
#[derive(Debug, Default, Clone)]
pub struct PageScores {
    scores: HashMap<Path, i32>,
}

impl PageScores {
    /// Create an empty table; every page scores zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<(Path, i32)> for PageScores {
    fn from_iter<I: IntoIterator<Item = (Path, i32)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

impl SiteInfo for PageScores {
    fn score(&self, path: &Path) -> i32 {
        self.scores.get(path).copied().unwrap_or(0)
    }
}

/// Orders pages so that parents precede their descendants.
///
/// The root comes first and every page comes before its descendants.
/// Unrelated pages are ordered by the two ancestors where their paths
/// diverge: higher score first, then more total hits, then path order.
///
/// Hit totals are read from `hits`, a snapshot taken before sorting, so
/// concurrent hits cannot make the order inconsistent mid-sort.
pub(crate) struct Ranking<'a> {
    pub(crate) info: &'a dyn SiteInfo,
    pub(crate) hits: &'a HashMap<Path, u64>,
}

impl Ranking<'_> {
    pub(crate) fn compare(&self, a: &Path, b: &Path) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        if a.is_root() {
            return Ordering::Less;
        }
        if b.is_root() {
            return Ordering::Greater;
        }
        let common = a.common_path(b);
        if common == *a {
            return Ordering::Less;
        }
        if common == *b {
            return Ordering::Greater;
        }

        let depth = common.element_count() + 1;
        let (branch_a, branch_b) = (a.partial(depth), b.partial(depth));
        let hits = |path: &Path| self.hits.get(path).copied().unwrap_or(0);
        self.info
            .score(&branch_b)
            .cmp(&self.info.score(&branch_a))
            .then_with(|| hits(&branch_b).cmp(&hits(&branch_a)))
            .then_with(|| branch_a.cmp(&branch_b))
    }
}
