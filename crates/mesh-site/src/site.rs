//! Owner of the current site index.
//!
//! [`Site`] holds the published [`SiteIndex`] behind an `RwLock<Arc<_>>`:
//! readers clone the `Arc` and release the lock immediately, publication
//! swaps the `Arc` under a brief write lock.
//!
//! Two kinds of rebuild exist:
//!
//! - [`Site::rebuild_now`] crawls on the calling thread and publishes before
//!   returning. Once its crawl is done it marks the snapshot it started from
//!   obsolete, so a background pass based on that snapshot discards its
//!   result instead of overwriting the forced one.
//! - [`Site::refresh_if_stale`] starts a background pass when the current
//!   snapshot is older than the rebuild interval. At most one runs at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use mesh_storage::ContentSource;

use crate::clock::{Clock, SystemClock};
use crate::crawler::{self, CrawlContext};
use crate::index::SiteIndex;
use crate::rank::{PageScores, SiteInfo};
use crate::settings::SiteSettings;

/// Thread-safe owner of the site index.
pub struct Site {
    source: Arc<dyn ContentSource>,
    settings: Arc<SiteSettings>,
    info: Arc<dyn SiteInfo>,
    clock: Arc<dyn Clock>,
    current: RwLock<Arc<SiteIndex>>,
    /// Serializes forced rebuilds and all publications.
    publish_lock: Mutex<()>,
    /// Set while a background pass runs.
    building: AtomicBool,
    /// Forces the next staleness check to rebuild.
    stale: AtomicBool,
    last_generation: AtomicU64,
}

/// Clears the in-flight flag when a background pass ends, even by panic.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Site {
    /// Create a site over `source` with an empty index.
    ///
    /// Call [`Site::rebuild_now`] to crawl before serving.
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>, settings: SiteSettings) -> Self {
        let settings = Arc::new(settings);
        Self {
            source,
            current: RwLock::new(Arc::new(SiteIndex::empty(Arc::clone(&settings)))),
            settings,
            info: Arc::new(PageScores::new()),
            clock: Arc::new(SystemClock),
            publish_lock: Mutex::new(()),
            building: AtomicBool::new(false),
            stale: AtomicBool::new(false),
            last_generation: AtomicU64::new(0),
        }
    }

    /// Use `info` for ranking scores.
    #[must_use]
    pub fn with_site_info(mut self, info: Arc<dyn SiteInfo>) -> Self {
        self.info = info;
        self
    }

    /// Use `clock` for snapshot ages and hit counters.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Content source the site is crawled from.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn ContentSource> {
        &self.source
    }

    /// Indexing settings.
    #[must_use]
    pub fn settings(&self) -> &SiteSettings {
        &self.settings
    }

    /// Clock used for snapshot ages and hit counters.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Currently published snapshot.
    #[must_use]
    pub fn index(&self) -> Arc<SiteIndex> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// True while a background pass is running.
    #[must_use]
    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::Acquire)
    }

    /// Make the next [`Site::refresh_if_stale`] rebuild regardless of age.
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// Crawl on the calling thread and publish the result.
    pub fn rebuild_now(&self) -> Arc<SiteIndex> {
        let _guard = self
            .publish_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let base = self.index();
        let next = crawler::build(&self.context(), Some(&base));
        base.mark_obsolete();
        self.publish(next)
    }

    /// Start a background pass if the snapshot is older than the rebuild
    /// interval or was invalidated.
    ///
    /// Returns the handle of the started thread, or `None` when the snapshot
    /// is fresh, a pass is already running, or the thread failed to start.
    pub fn refresh_if_stale(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let base = self.index();
        let age = self
            .clock
            .now()
            .duration_since(base.built_at())
            .unwrap_or_default();
        if age < self.settings.rebuild_interval && !self.stale.load(Ordering::Acquire) {
            return None;
        }
        if self
            .building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.stale.store(false, Ordering::Release);

        let site = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("mesh-site-builder".to_owned())
            .spawn(move || {
                let _in_flight = InFlight(&site.building);
                site.rebuild_in_background(&base);
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start background index build");
                self.building.store(false, Ordering::Release);
                None
            }
        }
    }

    fn rebuild_in_background(&self, base: &SiteIndex) {
        let next = crawler::build(&self.context(), Some(base));

        let _guard = self
            .publish_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if base.is_obsolete() {
            tracing::debug!("Discarding background build superseded by a forced rebuild");
            return;
        }
        base.mark_obsolete();
        self.publish(next);
    }

    /// Assign the next generation and swap `next` in. Callers hold the
    /// publish lock.
    fn publish(&self, mut next: SiteIndex) -> Arc<SiteIndex> {
        next.generation = self.last_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let next = Arc::new(next);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        tracing::debug!(generation = next.generation, "Published site index");
        next
    }

    fn context(&self) -> CrawlContext<'_> {
        CrawlContext {
            source: self.source.as_ref(),
            settings: &self.settings,
            info: self.info.as_ref(),
            clock: &self.clock,
        }
    }
}

#[cfg(test)]
mod tests {
    static_assertions::assert_impl_all!(super::Site: Send, Sync);
    static_assertions::assert_impl_all!(super::SiteIndex: Send, Sync);

    use std::time::{Duration, SystemTime};

    use mesh_path::Path;
    use mesh_storage::MockSource;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::ManualClock;

    const DAY: Duration = Duration::from_secs(86_400);

    struct Fixture {
        source: Arc<MockSource>,
        clock: Arc<ManualClock>,
        site: Arc<Site>,
    }

    fn fixture(settings: SiteSettings) -> Fixture {
        let source = Arc::new(
            MockSource::new()
                .with_file("index.html", 100, "<title>Home</title>")
                .with_file("news/index.html", 100, "<title>News</title>")
                .with_file("news/2020.html", 100, "<title>2020</title>"),
        );
        let clock = Arc::new(ManualClock::new(SystemTime::UNIX_EPOCH + 20_000 * DAY));
        let site = Arc::new(
            Site::new(Arc::clone(&source) as Arc<dyn ContentSource>, settings)
                .with_clock(Arc::clone(&clock) as Arc<dyn Clock>),
        );
        Fixture {
            source,
            clock,
            site,
        }
    }

    #[test]
    fn test_new_site_has_empty_index() {
        let f = fixture(SiteSettings::default());

        let index = f.site.index();

        assert!(index.is_empty());
        assert_eq!(index.generation(), 0);
    }

    #[test]
    fn test_rebuild_now_publishes() {
        let f = fixture(SiteSettings::default());
        let before = f.site.index();

        let index = f.site.rebuild_now();

        assert_eq!(index.generation(), 1);
        assert_eq!(index.len(), 3);
        assert!(before.is_obsolete());
        assert!(!index.is_obsolete());
        assert!(Arc::ptr_eq(&index, &f.site.index()));
    }

    #[test]
    fn test_stats_survive_rebuild() {
        let f = fixture(SiteSettings::default());
        let first = f.site.rebuild_now();
        let news = Path::new("news");
        first.get(&news).unwrap().stats.record_hit();

        f.source.write("news/index.html", 200, "<title>Latest</title>");
        let second = f.site.rebuild_now();

        let record = second.get(&news).unwrap();
        assert_eq!(record.title, "Latest");
        assert_eq!(record.stats.total_hits(), 1);
    }

    #[test]
    fn test_rollover_after_retention() {
        let settings = SiteSettings {
            retention_days: 7,
            ..SiteSettings::default()
        };
        let f = fixture(settings);
        let index = f.site.rebuild_now();
        let record = index.get(&Path::new("news/2020.html")).unwrap();
        record.stats.record_hit();

        f.clock.advance(8 * DAY);
        let rebuilt = f.site.rebuild_now();

        assert_eq!(
            rebuilt.get(&Path::new("news/2020.html")).unwrap().stats.hits(0),
            0
        );
        assert_eq!(record.stats.total_hits(), 0);
    }

    #[test]
    fn test_refresh_if_stale_respects_interval() {
        let f = fixture(SiteSettings::default());
        f.site.rebuild_now();

        assert!(f.site.refresh_if_stale().is_none());

        f.clock.advance(Duration::from_secs(301));
        let handle = f.site.refresh_if_stale().unwrap();
        handle.join().unwrap();

        assert_eq!(f.site.index().generation(), 2);
        assert!(!f.site.is_building());
    }

    #[test]
    fn test_invalidate_forces_refresh() {
        let f = fixture(SiteSettings::default());
        f.site.rebuild_now();
        f.source.write("about.html", 100, "<title>About</title>");

        f.site.invalidate();
        f.site.refresh_if_stale().unwrap().join().unwrap();

        assert!(f.site.index().get(&Path::new("about.html")).is_some());
        assert!(f.site.refresh_if_stale().is_none());
    }

    #[test]
    fn test_rebuild_now_carries_forward_from_live_snapshot() {
        let f = fixture(SiteSettings::default());
        let first = f.site.rebuild_now();
        let home = Arc::clone(first.get(&Path::root()).unwrap());

        let second = f.site.rebuild_now();

        assert!(first.is_obsolete());
        assert!(Arc::ptr_eq(&home, second.get(&Path::root()).unwrap()));
    }

    #[test]
    fn test_background_build_discarded_after_forced_rebuild() {
        let f = fixture(SiteSettings::default());
        let base = f.site.rebuild_now();

        let forced = f.site.rebuild_now();
        f.site.rebuild_in_background(&base);

        assert!(Arc::ptr_eq(&forced, &f.site.index()));
    }

    #[test]
    fn test_concurrent_readers_during_rebuilds() {
        let f = fixture(SiteSettings::default());
        f.site.rebuild_now();

        let readers: Vec<_> = (0..10)
            .map(|_| {
                let site = Arc::clone(&f.site);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let index = site.index();
                        let news = index.get(&Path::new("news")).unwrap();
                        news.stats.record_hit();
                        assert_eq!(index.len(), 3);
                    }
                })
            })
            .collect();
        for _ in 0..5 {
            f.site.rebuild_now();
        }
        for reader in readers {
            reader.join().unwrap();
        }

        let index = f.site.index();
        assert_eq!(index.get(&Path::new("news")).unwrap().stats.total_hits(), 1_000);
        assert_eq!(index.generation(), 6);
    }
}
