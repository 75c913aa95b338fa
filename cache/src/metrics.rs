use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// A thread-safe, internal metrics collector for the cache.
/// All fields are atomic to allow for lock-free updates.
#[derive(Debug)]
pub struct Metrics {
  // --- Hit/Miss Ratios (opt-in) ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,

  // --- Writes (opt-in) ---
  pub(crate) inserts: CachePadded<AtomicU64>,
  pub(crate) replacements: CachePadded<AtomicU64>,
  pub(crate) evictions: CachePadded<AtomicU64>,
  pub(crate) probe_misses: CachePadded<AtomicU64>,

  // --- Pool lifecycle ---
  pub(crate) shards_created: CachePadded<AtomicU64>,
  pub(crate) shards_discarded: CachePadded<AtomicU64>,
  pub(crate) sweeps: CachePadded<AtomicU64>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      inserts: CachePadded::new(AtomicU64::new(0)),
      replacements: CachePadded::new(AtomicU64::new(0)),
      evictions: CachePadded::new(AtomicU64::new(0)),
      probe_misses: CachePadded::new(AtomicU64::new(0)),
      shards_created: CachePadded::new(AtomicU64::new(0)),
      shards_discarded: CachePadded::new(AtomicU64::new(0)),
      sweeps: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Creates a point-in-time snapshot of the current metrics.
  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      inserts: self.inserts.load(Ordering::Relaxed),
      replacements: self.replacements.load(Ordering::Relaxed),
      evictions: self.evictions.load(Ordering::Relaxed),
      probe_misses: self.probe_misses.load(Ordering::Relaxed),
      shards_created: self.shards_created.load(Ordering::Relaxed),
      shards_discarded: self.shards_discarded.load(Ordering::Relaxed),
      sweeps: self.sweeps.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's metrics.
///
/// Lookup and write counters stay at zero unless the cache was built with
/// `record_access_metrics(true)`. Pool counters are always maintained.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// The number of lookups that found a value.
  pub hits: u64,
  /// The number of lookups that found nothing.
  pub misses: u64,
  /// The cache hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// The number of writes that added a new key to a shard.
  pub inserts: u64,
  /// The number of writes that overwrote an existing key in a shard.
  pub replacements: u64,
  /// The number of entries removed by the probe to make room.
  pub evictions: u64,
  /// The number of probe steps that landed past the end of a shard.
  pub probe_misses: u64,
  /// The number of shards built because the pool had none to lend.
  pub shards_created: u64,
  /// The number of released shards the pool declined to keep.
  pub shards_discarded: u64,
  /// The number of sweeps run, manual or scheduled.
  pub sweeps: u64,
  /// The number of seconds the cache has been running.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("inserts", &self.inserts)
      .field("replacements", &self.replacements)
      .field("evictions", &self.evictions)
      .field("probe_misses", &self.probe_misses)
      .field("shards_created", &self.shards_created)
      .field("shards_discarded", &self.shards_discarded)
      .field("sweeps", &self.sweeps)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
