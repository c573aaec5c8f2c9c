//! Crawl pass producing a [`SiteIndex`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use mesh_path::Path;
use mesh_storage::{ContentSource, Descend, EntryStat, TreeVisitor, walk};

use crate::clock::Clock;
use crate::index::SiteIndex;
use crate::locale::Language;
use crate::rank::{Ranking, SiteInfo};
use crate::record::PageRecord;
use crate::settings::SiteSettings;
use crate::stats::PageStats;

/// Everything a crawl pass reads.
pub(crate) struct CrawlContext<'a> {
    pub(crate) source: &'a dyn ContentSource,
    pub(crate) settings: &'a Arc<SiteSettings>,
    pub(crate) info: &'a dyn SiteInfo,
    pub(crate) clock: &'a Arc<dyn Clock>,
}

/// Walk the whole site and build a new snapshot.
///
/// Records of `previous` are carried forward: unchanged pages are reused as
/// is, changed pages keep their hit counters. An obsolete `previous` is
/// ignored.
pub(crate) fn build(ctx: &CrawlContext<'_>, previous: Option<&SiteIndex>) -> SiteIndex {
    let started = Instant::now();
    let previous = previous.filter(|index| !index.is_obsolete());
    let mut crawler = Crawler {
        ctx,
        previous,
        pages: BTreeMap::new(),
        welcomes: HashMap::new(),
        parsed: 0,
        reused: 0,
    };
    walk(ctx.source, &Path::root(), &mut crawler);
    let Crawler {
        pages,
        welcomes,
        parsed,
        reused,
        ..
    } = crawler;

    let hits: HashMap<Path, u64> = pages
        .iter()
        .map(|(path, record)| (path.clone(), record.stats.total_hits()))
        .collect();
    let ranking = Ranking {
        info: ctx.info,
        hits: &hits,
    };
    let mut ranked: Vec<Arc<PageRecord>> = pages.values().map(Arc::clone).collect();
    ranked.sort_by(|a, b| ranking.compare(&a.path, &b.path));

    let languages = ranked
        .iter()
        .filter_map(|record| Language::from_record(record))
        .collect();

    tracing::info!(
        pages = pages.len(),
        parsed,
        reused,
        elapsed_ms = started.elapsed().as_millis(),
        "Site index built"
    );

    SiteIndex::new(
        ctx.clock.now(),
        pages,
        ranked,
        welcomes,
        languages,
        Arc::clone(ctx.settings),
    )
}

struct Crawler<'a, 'c> {
    ctx: &'a CrawlContext<'c>,
    previous: Option<&'a SiteIndex>,
    pages: BTreeMap<Path, Arc<PageRecord>>,
    welcomes: HashMap<Path, Path>,
    parsed: usize,
    reused: usize,
}

impl Crawler<'_, '_> {
    /// First configured welcome file present in `dir`.
    fn find_welcome(&self, dir: &Path) -> Option<Path> {
        self.ctx
            .settings
            .welcome_files
            .iter()
            .map(|name| dir.add(name.as_str()))
            .find(|candidate| {
                self.ctx
                    .source
                    .stat(candidate)
                    .is_some_and(|stat| stat.is_file())
            })
    }

    fn record(&mut self, path: Path, file: &Path, stat: &EntryStat) -> Arc<PageRecord> {
        let old = self.previous.and_then(|index| index.pages.get(&path));
        if let Some(old) = old
            && old.source == *file
            && old.last_modified == stat.modified
        {
            self.reused += 1;
            return Arc::clone(old);
        }

        let stats = old.map_or_else(
            || {
                Arc::new(PageStats::new(
                    Arc::clone(self.ctx.clock),
                    self.ctx.settings.retention_days,
                ))
            },
            |old| Arc::clone(&old.stats),
        );
        self.parsed += 1;
        let record = match self.ctx.source.read_metadata(file) {
            Ok(page) => PageRecord::from_source(
                path,
                file.clone(),
                stat.modified,
                page,
                self.ctx.settings.excerpt_length,
                stats,
            ),
            Err(e) => {
                tracing::warn!(path = %file, error = %e, "Failed to parse page");
                PageRecord::unparsed(path, file.clone(), stats)
            }
        };
        Arc::new(record)
    }
}

impl TreeVisitor for Crawler<'_, '_> {
    fn enter_directory(&mut self, path: &Path, _stat: &EntryStat) -> Descend {
        if self.ctx.settings.is_system(path) {
            tracing::debug!(path = %path, "Skipping system directory");
            return Descend::SkipSubtree;
        }
        match self.find_welcome(path) {
            Some(welcome) => {
                self.welcomes.insert(path.clone(), welcome);
                Descend::Continue
            }
            None => {
                tracing::debug!(path = %path, "Skipping directory without welcome file");
                Descend::SkipSubtree
            }
        }
    }

    fn visit_file(&mut self, path: &Path, stat: &EntryStat) {
        if !self.ctx.settings.is_page(path.last()) || self.ctx.settings.is_system(path) {
            return;
        }
        let dir = path.parent();
        let Some(welcome) = self.welcomes.get(&dir) else {
            return;
        };
        let grandparent = dir.parent();
        if !grandparent.is_relative() && !self.welcomes.contains_key(&grandparent) {
            return;
        }

        let key = if welcome == path { dir } else { path.clone() };
        let record = self.record(key.clone(), path, stat);
        self.pages.insert(key, record);
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use mesh_storage::MockSource;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::ManualClock;
    use crate::rank::PageScores;

    fn crawl(source: &MockSource, previous: Option<&SiteIndex>) -> SiteIndex {
        let settings = Arc::new(SiteSettings::default());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000),
        ));
        let ctx = CrawlContext {
            source,
            settings: &settings,
            info: &PageScores::new(),
            clock: &clock,
        };
        build(&ctx, previous)
    }

    fn ranked_paths(index: &SiteIndex) -> Vec<String> {
        index.ranked().iter().map(|r| r.path.to_string()).collect()
    }

    #[test]
    fn test_crawl_indexes_welcome_files_under_directories() {
        let source = MockSource::new()
            .with_file("index.html", 100, "<title>Home</title>")
            .with_file("news/index.html", 100, "<title>News</title>")
            .with_file("news/2020.html", 100, "<title>2020</title>");

        let index = crawl(&source, None);

        assert_eq!(ranked_paths(&index), vec!["", "news", "news/2020.html"]);
        assert_eq!(index.get(&Path::root()).unwrap().title, "Home");
        assert_eq!(
            index.current_welcome(&Path::new("news")),
            Some(&Path::new("news/index.html"))
        );
    }

    #[test]
    fn test_crawl_skips_directories_without_welcome_file() {
        let source = MockSource::new()
            .with_file("index.html", 100, "")
            .with_file("drafts/idea.html", 100, "")
            .with_file("drafts/sub/index.html", 100, "");

        let index = crawl(&source, None);

        assert_eq!(ranked_paths(&index), vec![""]);
    }

    #[test]
    fn test_crawl_without_root_welcome_is_empty() {
        let source = MockSource::new().with_file("news/index.html", 100, "");

        let index = crawl(&source, None);

        assert!(index.is_empty());
    }

    #[test]
    fn test_crawl_ignores_non_pages_and_system_dirs() {
        let source = MockSource::new()
            .with_file("index.html", 100, "")
            .with_file("style.css", 100, "")
            .with_file("WEB-INF/index.html", 100, "")
            .with_file("private/notes.html", 100, "");

        let index = crawl(&source, None);

        assert_eq!(ranked_paths(&index), vec![""]);
    }

    #[test]
    fn test_crawl_prefers_first_welcome_name() {
        let source = MockSource::new()
            .with_file("index.htm", 100, "<title>Old</title>")
            .with_file("index.html", 100, "<title>New</title>");

        let index = crawl(&source, None);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&Path::root()).unwrap().title, "New");
        assert!(index.get(&Path::new("index.htm")).is_some());
    }

    #[test]
    fn test_crawl_unreadable_page_gets_placeholder() {
        let source = MockSource::new()
            .with_file("index.html", 100, "")
            .with_unreadable_file("broken-page.html", 100);

        let index = crawl(&source, None);
        let record = index.get(&Path::new("broken-page.html")).unwrap();

        assert_eq!(record.title, "Broken Page");
        assert_eq!(record.last_modified, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_crawl_reuses_unchanged_records() {
        let source = MockSource::new()
            .with_file("index.html", 100, "<title>Home</title>")
            .with_file("about.html", 100, "<title>About</title>");
        let first = crawl(&source, None);

        source.write("about.html", 200, "<title>About us</title>");
        let second = crawl(&source, Some(&first));

        let home = (first.get(&Path::root()).unwrap(), second.get(&Path::root()).unwrap());
        assert!(Arc::ptr_eq(home.0, home.1));

        let about = (
            first.get(&Path::new("about.html")).unwrap(),
            second.get(&Path::new("about.html")).unwrap(),
        );
        assert!(!Arc::ptr_eq(about.0, about.1));
        assert!(Arc::ptr_eq(&about.0.stats, &about.1.stats));
        assert_eq!(about.1.title, "About us");
    }

    #[test]
    fn test_crawl_ignores_obsolete_previous_snapshot() {
        let source = MockSource::new().with_file("index.html", 100, "<title>Home</title>");
        let first = crawl(&source, None);
        first.mark_obsolete();

        let second = crawl(&source, Some(&first));

        let home = (first.get(&Path::root()).unwrap(), second.get(&Path::root()).unwrap());
        assert!(!Arc::ptr_eq(home.0, home.1));
        assert!(!Arc::ptr_eq(&home.0.stats, &home.1.stats));
    }

    #[test]
    fn test_crawl_ranks_by_hits_of_previous_counters() {
        let source = MockSource::new()
            .with_file("index.html", 100, "")
            .with_file("a.html", 100, "")
            .with_file("b.html", 100, "");
        let first = crawl(&source, None);
        first.get(&Path::new("b.html")).unwrap().stats.record_hit();

        let second = crawl(&source, Some(&first));

        assert_eq!(ranked_paths(&second), vec!["", "b.html", "a.html"]);
    }

    #[test]
    fn test_crawl_detects_languages() {
        let source = MockSource::new()
            .with_file("index.html", 100, "")
            .with_file("en/index.html", 100, "<title>English</title>")
            .with_file("pt_BR/index.html", 100, "<title>Português</title>")
            .with_file("news/index.html", 100, "");

        let index = crawl(&source, None);
        let codes: Vec<&str> = index.languages().iter().map(|l| l.code.as_str()).collect();

        assert_eq!(codes, vec!["en", "pt_BR"]);
        assert_eq!(index.languages()[0].title, "English");
    }
}
