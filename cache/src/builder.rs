use crate::error::BuildError;
use crate::handles::PooledCache;
use crate::metrics::Metrics;
use crate::pool::{PoolHandle, ShardPool, StripedPool, DEFAULT_SHARDS_PER_SLOT, MAX_POOL_SLOTS};
use crate::shard::{effective_probe_boundary, DEFAULT_PROBE_BOUNDARY};
use crate::shared::CacheShared;
use crate::task::sweeper::Sweeper;

use core::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// The per-shard capacity used when none is configured.
pub const DEFAULT_MAX_SIZE_PER_SHARD: usize = 64;

/// How often a cache clears its pool unless configured otherwise.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// A builder for creating [`PooledCache`] instances.
pub struct CacheBuilder<K, V, H = ahash::RandomState> {
  max_size_per_shard: usize,
  probe_boundary: usize,
  slots: usize,
  shards_per_slot: usize,
  sweep_interval: Option<Duration>,
  record_access_metrics: bool,
  hasher: H,
  pool: Option<Arc<dyn ShardPool<K, V, H>>>,
  _marker: PhantomData<fn() -> (K, V)>,
}

// Manual Debug implementation for CacheBuilder.
impl<K, V, H> fmt::Debug for CacheBuilder<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("max_size_per_shard", &self.max_size_per_shard)
      .field("probe_boundary", &self.probe_boundary)
      .field("slots", &self.slots)
      .field("shards_per_slot", &self.shards_per_slot)
      .field("sweep_interval", &self.sweep_interval)
      .field("record_access_metrics", &self.record_access_metrics)
      .field("has_custom_pool", &self.pool.is_some())
      .finish_non_exhaustive()
  }
}

// --- General Configuration Methods ---
impl<K, V, H> CacheBuilder<K, V, H> {
  /// Sets how many entries each shard may hold before writes start evicting.
  ///
  /// Zero is allowed: every write of a new key then evicts what the shard held.
  pub fn max_size_per_shard(mut self, max_size: usize) -> Self {
    self.max_size_per_shard = max_size;
    self
  }

  /// Sets how far into a shard's iteration order the eviction probe may reach.
  ///
  /// The effective value is `min(probe_boundary, max_size_per_shard)`, and at
  /// least one. Defaults to `10`.
  pub fn probe_boundary(mut self, probe_boundary: usize) -> Self {
    self.probe_boundary = probe_boundary;
    self
  }

  /// Sets the number of free lists in the default pool.
  ///
  /// The count is rounded up to a power of two when the pool is built and may
  /// not exceed [`MAX_POOL_SLOTS`].
  pub fn slots(mut self, slots: usize) -> Self {
    self.slots = slots.max(1);
    self
  }

  /// Sets how many idle shards each free list of the default pool may keep.
  /// Shards released to a full list are dropped.
  pub fn shards_per_slot(mut self, shards_per_slot: usize) -> Self {
    self.shards_per_slot = shards_per_slot;
    self
  }

  /// Sets how often the background sweeper clears the whole pool.
  /// Defaults to [`DEFAULT_SWEEP_INTERVAL`].
  pub fn sweep_interval(mut self, interval: Duration) -> Self {
    self.sweep_interval = Some(interval);
    self
  }

  /// Builds the cache without a background sweeper.
  ///
  /// Idle shards are then only dropped by the pool itself or by
  /// [`PooledCache::sweep`], so stale entries may live as long as the cache.
  pub fn disable_sweeper(mut self) -> Self {
    self.sweep_interval = None;
    self
  }

  /// Counts hits, misses and write outcomes. Off by default, because a
  /// counter shared by every thread perturbs the hot path this cache exists
  /// to keep uncontended.
  pub fn record_access_metrics(mut self, enabled: bool) -> Self {
    self.record_access_metrics = enabled;
    self
  }

  /// Replaces the default [`StripedPool`] with a custom pool.
  ///
  /// `slots` and `shards_per_slot` are ignored when a custom pool is set.
  pub fn pool<P>(self, pool: P) -> Self
  where
    P: ShardPool<K, V, H> + 'static,
  {
    self.pool_arc(Arc::new(pool))
  }

  /// Like [`pool`](Self::pool), but keeps a shared handle so the caller can
  /// inspect the pool afterwards.
  pub fn pool_arc<P>(mut self, pool: Arc<P>) -> Self
  where
    P: ShardPool<K, V, H> + 'static,
  {
    self.pool = Some(pool);
    self
  }
}

// --- Default Constructor ---
impl<K, V, H: BuildHasher + Default> CacheBuilder<K, V, H> {
  /// Creates a new `CacheBuilder` with default settings.
  pub fn new() -> Self {
    Self {
      max_size_per_shard: DEFAULT_MAX_SIZE_PER_SHARD,
      probe_boundary: DEFAULT_PROBE_BOUNDARY,
      slots: (num_cpus::get() * 2).clamp(1, MAX_POOL_SLOTS),
      shards_per_slot: DEFAULT_SHARDS_PER_SLOT,
      sweep_interval: Some(DEFAULT_SWEEP_INTERVAL),
      record_access_metrics: false,
      hasher: H::default(),
      pool: None,
      _marker: PhantomData,
    }
  }
}

impl<K, V> Default for CacheBuilder<K, V, ahash::RandomState> {
  fn default() -> Self {
    Self::new()
  }
}

// --- Build Methods ---
impl<K, V, H> CacheBuilder<K, V, H>
where
  K: Eq + Hash + Clone + Send + 'static,
  V: Send + 'static,
  H: BuildHasher + Clone + Send + 'static,
{
  /// Sets the hasher used by every shard's map.
  pub fn hasher(mut self, hasher: H) -> Self {
    self.hasher = hasher;
    self
  }

  /// Builds the cache.
  pub fn build(self) -> Result<PooledCache<K, V, H>, BuildError> {
    self.validate()?;

    let metrics = Arc::new(Metrics::new());
    let pool: Arc<dyn ShardPool<K, V, H>> = match self.pool {
      Some(pool) => pool,
      None => Arc::new(StripedPool::new(self.slots, self.shards_per_slot)),
    };

    let sweeper = self
      .sweep_interval
      .map(|interval| Sweeper::spawn(Arc::clone(&pool), Arc::clone(&metrics), interval));

    let handle = PoolHandle {
      pool,
      metrics: Arc::clone(&metrics),
      max_size: self.max_size_per_shard,
      probe_boundary: effective_probe_boundary(self.probe_boundary, self.max_size_per_shard),
      hasher: self.hasher,
    };

    Ok(PooledCache {
      shared: Arc::new(CacheShared {
        pool: handle,
        metrics,
        sweeper,
        record_access: self.record_access_metrics,
      }),
    })
  }

  /// Validates the builder configuration.
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if self.probe_boundary == 0 {
      return Err(BuildError::ZeroProbeBoundary);
    }
    if self.sweep_interval == Some(Duration::ZERO) {
      return Err(BuildError::ZeroSweepInterval);
    }
    if self.pool.is_none() && self.shards_per_slot == 0 {
      return Err(BuildError::ZeroShardsPerSlot);
    }
    if self.pool.is_none() && self.slots > MAX_POOL_SLOTS {
      return Err(BuildError::TooManySlots {
        requested: self.slots,
        max: MAX_POOL_SLOTS,
      });
    }
    Ok(())
  }
}
