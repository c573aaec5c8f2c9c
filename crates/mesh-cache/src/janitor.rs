//! Background removal of expired cache, temporary and backup files.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use chrono::{Local, NaiveDateTime, TimeZone};
use mesh_path::Path;
use mesh_storage::{Descend, EntryStat, FsSource, TreeVisitor, walk};

/// Length of the `YYYYMMDDhhmmss` stamp in backup file names.
const STAMP_LEN: usize = 14;

/// Files the janitor never touches.
const PROTECTED: &[&str] = &["VERSION"];

/// What a janitor pass removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JanitorReport {
    /// Files deleted.
    pub files_removed: usize,
    /// Empty directories deleted.
    pub dirs_removed: usize,
}

/// Deletes files older than a maximum age below a directory.
///
/// A file's age comes from the `_YYYYMMDDhhmmss` stamp in its name when it
/// has one (backup copies), otherwise from its modification time. Empty
/// directories left behind are removed too; the root itself is kept.
#[derive(Debug, Clone)]
pub struct Janitor {
    root: PathBuf,
    max_age: Duration,
}

impl Janitor {
    /// Create a janitor for `root`.
    #[must_use]
    pub fn new(root: PathBuf, max_age: Duration) -> Self {
        Self { root, max_age }
    }

    /// Run one pass with the current time.
    pub fn run(&self) -> JanitorReport {
        self.run_at(SystemTime::now())
    }

    /// Run one pass as if the current time were `now`.
    pub fn run_at(&self, now: SystemTime) -> JanitorReport {
        let source = FsSource::new(self.root.clone());
        let mut sweep = Sweep {
            source: &source,
            cutoff: now.checked_sub(self.max_age).unwrap_or(SystemTime::UNIX_EPOCH),
            report: JanitorReport::default(),
        };
        walk(&source, &Path::root(), &mut sweep);
        if sweep.report != JanitorReport::default() {
            tracing::info!(
                root = %self.root.display(),
                files = sweep.report.files_removed,
                dirs = sweep.report.dirs_removed,
                "Janitor pass complete"
            );
        }
        sweep.report
    }

    /// Run one pass on a dedicated background thread.
    pub fn spawn(self) -> io::Result<JoinHandle<JanitorReport>> {
        thread::Builder::new()
            .name("mesh-janitor".to_owned())
            .spawn(move || self.run())
    }
}

struct Sweep<'a> {
    source: &'a FsSource,
    cutoff: SystemTime,
    report: JanitorReport,
}

impl TreeVisitor for Sweep<'_> {
    fn enter_directory(&mut self, _path: &Path, _stat: &EntryStat) -> Descend {
        Descend::Continue
    }

    fn visit_file(&mut self, path: &Path, stat: &EntryStat) {
        if path.element_count() == 1 && PROTECTED.contains(&path.last()) {
            return;
        }
        let born = backup_stamp(path.last()).unwrap_or(stat.modified);
        if born >= self.cutoff {
            return;
        }
        let Some(file) = self.source.resolve(path) else {
            return;
        };
        match fs::remove_file(&file) {
            Ok(()) => {
                tracing::debug!(file = %file.display(), "Removed expired file");
                self.report.files_removed += 1;
            }
            Err(e) => tracing::warn!(file = %file.display(), error = %e, "Failed to remove file"),
        }
    }

    fn leave_directory(&mut self, path: &Path) {
        if path.is_root() {
            return;
        }
        let Some(dir) = self.source.resolve(path) else {
            return;
        };
        // Fails harmlessly when the directory still has entries.
        if fs::remove_dir(&dir).is_ok() {
            self.report.dirs_removed += 1;
        }
    }
}

/// Local time encoded in a `<stem>_YYYYMMDDhhmmss[.ext]` file name.
fn backup_stamp(name: &str) -> Option<SystemTime> {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let (_, stamp) = stem.rsplit_once('_')?;
    if stamp.len() != STAMP_LEN || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some(local.into())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    fn create_test_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_backup_stamp() {
        let stamp = backup_stamp("page_20200131235959.html").unwrap();
        let expected: SystemTime = Local
            .with_ymd_and_hms(2020, 1, 31, 23, 59, 59)
            .earliest()
            .unwrap()
            .into();
        assert_eq!(stamp, expected);

        assert_eq!(backup_stamp("page.html"), None);
        assert_eq!(backup_stamp("my_page.html"), None);
        assert_eq!(backup_stamp("page_2020.html"), None);
        assert_eq!(backup_stamp("page_20201399000000.html"), None);
    }

    #[test]
    fn test_janitor_removes_expired_files_and_empty_dirs() {
        let tmp = create_test_dir();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("news/index.html")).unwrap();
        fs::write(root.join("news/index.html/_cache-1.gz"), b"x").unwrap();
        fs::write(root.join("VERSION"), "mesh-cache-2").unwrap();

        let janitor = Janitor::new(root.clone(), DAY);
        let report = janitor.run_at(SystemTime::now() + 2 * DAY);

        assert_eq!(
            report,
            JanitorReport {
                files_removed: 1,
                dirs_removed: 2,
            }
        );
        assert!(!root.join("news").exists());
        assert!(root.join("VERSION").is_file());
        assert!(root.is_dir());
    }

    #[test]
    fn test_janitor_keeps_fresh_files() {
        let tmp = create_test_dir();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("index.html")).unwrap();
        fs::write(root.join("index.html/_cache-1.gz"), b"x").unwrap();
        fs::write(root.join("_tmp_abc.gz"), b"partial").unwrap();

        let report = Janitor::new(root.clone(), DAY).run();

        assert_eq!(report, JanitorReport::default());
        assert!(root.join("index.html/_cache-1.gz").is_file());
        assert!(root.join("_tmp_abc.gz").is_file());
    }

    #[test]
    fn test_janitor_uses_backup_stamp_over_mtime() {
        let tmp = create_test_dir();
        let root = tmp.path().to_path_buf();
        // Freshly written, but the name says 2001.
        fs::write(root.join("page_20010101000000.html"), b"old copy").unwrap();
        fs::write(root.join("page.html"), b"current").unwrap();

        let report = Janitor::new(root.clone(), DAY).run();

        assert_eq!(report.files_removed, 1);
        assert!(!root.join("page_20010101000000.html").exists());
        assert!(root.join("page.html").is_file());
    }

    #[test]
    fn test_janitor_spawn() {
        let tmp = create_test_dir();
        fs::write(tmp.path().join("page_20010101000000.html"), b"old").unwrap();

        let handle = Janitor::new(tmp.path().to_path_buf(), DAY).spawn().unwrap();

        assert_eq!(handle.join().unwrap().files_removed, 1);
    }
}
