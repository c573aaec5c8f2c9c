//! Depth-first traversal of a content tree.

use mesh_path::Path;

use crate::source::{ContentSource, DirEntry, EntryStat};

/// Whether [`walk`] should descend into a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descend {
    /// Visit the directory's entries.
    Continue,
    /// Skip the directory and everything below it.
    SkipSubtree,
}

/// Callbacks driven by [`walk`].
pub trait TreeVisitor {
    /// Called before a directory's entries are visited.
    fn enter_directory(&mut self, path: &Path, stat: &EntryStat) -> Descend;

    /// Called for each regular file.
    fn visit_file(&mut self, path: &Path, stat: &EntryStat);

    /// Called after all entries of an entered directory were visited.
    ///
    /// Not called for directories skipped by `enter_directory`.
    fn leave_directory(&mut self, _path: &Path) {}
}

/// Walk the tree below `root` depth-first.
///
/// Entries are visited in name order, directories first among equal names.
/// A directory that cannot be listed is logged and treated as empty.
/// Nothing is visited when `root` is not a directory.
pub fn walk(source: &dyn ContentSource, root: &Path, visitor: &mut dyn TreeVisitor) {
    let Some(stat) = source.stat(root) else {
        tracing::debug!(root = %root, "Walk root does not exist");
        return;
    };
    if stat.is_dir() {
        walk_directory(source, root, &stat, visitor);
    }
}

fn walk_directory(
    source: &dyn ContentSource,
    dir: &Path,
    stat: &EntryStat,
    visitor: &mut dyn TreeVisitor,
) {
    if visitor.enter_directory(dir, stat) == Descend::SkipSubtree {
        return;
    }

    let mut entries = match source.list(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir, error = %e, "Failed to list directory");
            Vec::new()
        }
    };
    sort_entries(&mut entries);

    for entry in entries {
        let path = dir.add(entry.name.as_str());
        // Names that normalize away ("." or "..") would revisit or escape.
        if path.parent() != *dir {
            continue;
        }
        if entry.stat.is_dir() {
            walk_directory(source, &path, &entry.stat, visitor);
        } else {
            visitor.visit_file(&path, &entry.stat);
        }
    }

    visitor.leave_directory(dir);
}

fn sort_entries(entries: &mut [DirEntry]) {
    entries.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| b.stat.is_dir().cmp(&a.stat.is_dir()))
    });
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::FsSource;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        skip: Vec<&'static str>,
    }

    impl TreeVisitor for Recorder {
        fn enter_directory(&mut self, path: &Path, _stat: &EntryStat) -> Descend {
            self.events.push(format!("enter /{path}"));
            let name = path.to_string();
            if self.skip.iter().any(|skipped| *skipped == name) {
                Descend::SkipSubtree
            } else {
                Descend::Continue
            }
        }

        fn visit_file(&mut self, path: &Path, _stat: &EntryStat) {
            self.events.push(format!("file /{path}"));
        }

        fn leave_directory(&mut self, path: &Path) {
            self.events.push(format!("leave /{path}"));
        }
    }

    fn create_tree() -> tempfile::TempDir {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("index.html"), "").unwrap();
        fs::create_dir_all(root.join("news/archive")).unwrap();
        fs::write(root.join("news/index.html"), "").unwrap();
        fs::write(root.join("news/2020.html"), "").unwrap();
        fs::write(root.join("news/archive/old.html"), "").unwrap();
        fs::create_dir(root.join("admin")).unwrap();
        fs::write(root.join("admin/secret.html"), "").unwrap();
        temp_dir
    }

    #[test]
    fn test_walk_visits_in_sorted_order() {
        let temp_dir = create_tree();
        let source = FsSource::new(temp_dir.path().to_path_buf());
        let mut recorder = Recorder::default();

        walk(&source, &Path::root(), &mut recorder);

        assert_eq!(
            recorder.events,
            vec![
                "enter /",
                "enter /admin",
                "file /admin/secret.html",
                "leave /admin",
                "file /index.html",
                "enter /news",
                "file /news/2020.html",
                "enter /news/archive",
                "file /news/archive/old.html",
                "leave /news/archive",
                "file /news/index.html",
                "leave /news",
                "leave /",
            ]
        );
    }

    #[test]
    fn test_walk_skips_subtree() {
        let temp_dir = create_tree();
        let source = FsSource::new(temp_dir.path().to_path_buf());
        let mut recorder = Recorder {
            skip: vec!["admin", "news/archive"],
            ..Recorder::default()
        };

        walk(&source, &Path::root(), &mut recorder);

        assert!(recorder.events.contains(&"enter /admin".to_owned()));
        assert!(!recorder.events.iter().any(|e| e.contains("secret")));
        assert!(!recorder.events.contains(&"leave /admin".to_owned()));
        assert!(!recorder.events.iter().any(|e| e.contains("old.html")));
        assert!(recorder.events.contains(&"file /news/2020.html".to_owned()));
    }

    #[test]
    fn test_walk_missing_root_visits_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = FsSource::new(temp_dir.path().join("missing"));
        let mut recorder = Recorder::default();

        walk(&source, &Path::root(), &mut recorder);

        assert!(recorder.events.is_empty());
    }
}
