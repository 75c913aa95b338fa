use crate::metrics::Metrics;
use crate::pool::PoolHandle;
use crate::shard::InsertOutcome;
use crate::task::sweeper::Sweeper;

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// The internal, thread-safe core of the cache.
pub(crate) struct CacheShared<K, V, H> {
  pub(crate) pool: PoolHandle<K, V, H>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) sweeper: Option<Sweeper>,
  pub(crate) record_access: bool,
}

impl<K, V, H> fmt::Debug for CacheShared<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("pool", &self.pool)
      .field("has_sweeper", &self.sweeper.is_some())
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<K, V, H> Drop for CacheShared<K, V, H> {
  fn drop(&mut self) {
    if let Some(sweeper) = self.sweeper.take() {
      sweeper.stop();
    }
  }
}

impl<K, V, H> CacheShared<K, V, H> {
  #[inline]
  pub(crate) fn record_lookup(&self, hit: bool) {
    if !self.record_access {
      return;
    }
    let counter = if hit {
      &self.metrics.hits
    } else {
      &self.metrics.misses
    };
    counter.fetch_add(1, Ordering::Relaxed);
  }

  #[inline]
  pub(crate) fn record_insert(&self, outcome: InsertOutcome) {
    if !self.record_access {
      return;
    }
    let metrics = &self.metrics;
    match outcome {
      InsertOutcome::Inserted => {
        metrics.inserts.fetch_add(1, Ordering::Relaxed);
      }
      InsertOutcome::Replaced => {
        metrics.replacements.fetch_add(1, Ordering::Relaxed);
      }
      InsertOutcome::Evicted => {
        metrics.inserts.fetch_add(1, Ordering::Relaxed);
        metrics.evictions.fetch_add(1, Ordering::Relaxed);
      }
      InsertOutcome::ProbeMissed => {
        metrics.inserts.fetch_add(1, Ordering::Relaxed);
        metrics.probe_misses.fetch_add(1, Ordering::Relaxed);
      }
    }
  }
}
