//! Moved-page redirect lookup.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use mesh_path::Path;

use crate::settings::SiteSettings;

/// Finds the indexed page that best matches a path that no longer exists.
///
/// Candidates keep the order they were given in (ranked order), and the
/// first candidate with the longest common segment prefix wins. Results are
/// memoized for the lifetime of the index they belong to.
pub(crate) struct RedirectIndex {
    candidates: Vec<(Vec<String>, Path)>,
    memo: Mutex<HashMap<Path, Option<Path>>>,
}

impl RedirectIndex {
    pub(crate) fn build<'a>(
        paths: impl IntoIterator<Item = &'a Path>,
        settings: &SiteSettings,
    ) -> Self {
        let candidates = paths
            .into_iter()
            .filter(|path| !path.is_root())
            .map(|path| (comparable(path, settings), path.clone()))
            .collect();
        Self {
            candidates,
            memo: Mutex::default(),
        }
    }

    pub(crate) fn find(&self, requested: &Path, settings: &SiteSettings) -> Option<Path> {
        if let Some(found) = self
            .memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(requested)
        {
            return found.clone();
        }

        let wanted = comparable(requested, settings);
        let mut best_len = 0;
        let mut best = None;
        for (segments, path) in &self.candidates {
            let len = segments
                .iter()
                .zip(&wanted)
                .take_while(|(a, b)| a == b)
                .count();
            if len > best_len {
                best_len = len;
                best = Some(path);
            }
        }
        let found = best.cloned();
        tracing::debug!(requested = %requested, found = ?found, "Resolved moved page");

        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(requested.clone(), found.clone());
        found
    }
}

/// Segments with a trailing welcome file dropped and the page extension of
/// the last segment removed.
fn comparable(path: &Path, settings: &SiteSettings) -> Vec<String> {
    let mut segments = path.segments().to_vec();
    if segments
        .last()
        .is_some_and(|last| settings.is_welcome_name(last))
    {
        segments.pop();
    }
    if let Some(last) = segments.last_mut() {
        let stripped = settings.strip_page_extension(last).len();
        last.truncate(stripped);
    }
    segments
}
