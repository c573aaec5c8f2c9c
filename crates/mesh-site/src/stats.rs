//! Per-page hit counters.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::clock::Clock;

const SECS_PER_DAY: u64 = 86_400;

/// Rolling window of daily hit counts for one page.
///
/// Bucket `0` is today, bucket `n` is `n` days ago. Days are calendar days
/// in UTC. Buckets roll lazily: every access first zeroes the buckets for
/// the days that passed since the last access. Instances are shared between
/// index snapshots, so rebuilding the index never resets them.
pub struct PageStats {
    clock: Arc<dyn Clock>,
    inner: Mutex<Buckets>,
}

struct Buckets {
    counts: Vec<u32>,
    total: u64,
    day: u64,
}

impl Buckets {
    /// Advance the window to `today`. A clock moving backwards is ignored.
    fn roll(&mut self, today: u64) {
        if today <= self.day {
            return;
        }
        let len = self.counts.len();
        let elapsed = usize::try_from(today - self.day).map_or(len, |days| days.min(len));
        for day in self.day + 1..=self.day + elapsed as u64 {
            let slot = bucket(day, len);
            self.total -= u64::from(self.counts[slot]);
            self.counts[slot] = 0;
        }
        self.day = today;
    }

    fn slot(&self, days_ago: usize) -> usize {
        bucket(self.day - days_ago as u64, self.counts.len())
    }
}

/// Ring-buffer slot of an absolute day number.
fn bucket(day: u64, len: usize) -> usize {
    // Lossless: the remainder is below `len`.
    #[allow(clippy::cast_possible_truncation)]
    let slot = (day % len as u64) as usize;
    slot
}

fn day_of(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_secs() / SECS_PER_DAY)
}

impl PageStats {
    /// Create counters keeping `retention_days` daily buckets (at least one).
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, retention_days: usize) -> Self {
        let len = retention_days.max(1);
        let day = day_of(clock.now()).max(len as u64);
        Self {
            clock,
            inner: Mutex::new(Buckets {
                counts: vec![0; len],
                total: 0,
                day,
            }),
        }
    }

    fn rolled(&self) -> std::sync::MutexGuard<'_, Buckets> {
        let today = day_of(self.clock.now());
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.roll(today);
        inner
    }

    /// Count one hit for today.
    pub fn record_hit(&self) {
        let mut inner = self.rolled();
        let slot = inner.slot(0);
        inner.counts[slot] = inner.counts[slot].saturating_add(1);
        inner.total += 1;
    }

    /// Hits recorded `days_ago` days ago; zero outside the window.
    #[must_use]
    pub fn hits(&self, days_ago: usize) -> u32 {
        let inner = self.rolled();
        if days_ago >= inner.counts.len() {
            return 0;
        }
        inner.counts[inner.slot(days_ago)]
    }

    /// Sum of all buckets in the window.
    #[must_use]
    pub fn total_hits(&self) -> u64 {
        self.rolled().total
    }

    /// Number of daily buckets.
    #[must_use]
    pub fn retention_days(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .counts
            .len()
    }
}

impl std::fmt::Debug for PageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("PageStats")
            .field("total", &inner.total)
            .field("days", &inner.counts.len())
            .finish_non_exhaustive()
    }
}
