#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fibre_pcache::{CacheBuilder, PooledCache, Shard, ShardPool, StripedPool};

/// Wraps a `StripedPool` and records the largest shard it has ever seen
/// handed back, so tests can observe shard sizes between calls.
pub struct InspectingPool<K, V> {
  inner: StripedPool<K, V, ahash::RandomState>,
  pub largest_released: AtomicUsize,
  pub releases: AtomicUsize,
}

impl<K, V> InspectingPool<K, V> {
  pub fn new(slots: usize, shards_per_slot: usize) -> Self {
    Self {
      inner: StripedPool::new(slots, shards_per_slot),
      largest_released: AtomicUsize::new(0),
      releases: AtomicUsize::new(0),
    }
  }

  pub fn largest_released(&self) -> usize {
    self.largest_released.load(Ordering::Relaxed)
  }
}

impl<K: Send, V: Send> ShardPool<K, V, ahash::RandomState> for InspectingPool<K, V> {
  fn try_acquire(&self) -> Option<Shard<K, V, ahash::RandomState>> {
    self.inner.try_acquire()
  }

  fn release(&self, shard: Shard<K, V, ahash::RandomState>) -> bool {
    self.releases.fetch_add(1, Ordering::Relaxed);
    self.largest_released.fetch_max(shard.len(), Ordering::Relaxed);
    self.inner.release(shard)
  }

  fn sweep(&self) -> usize {
    self.inner.sweep()
  }

  fn pooled(&self) -> usize {
    self.inner.pooled()
  }
}

// Helper to build a cache over an inspectable pool.
pub fn build_inspected_cache(
  max_size: usize,
  slots: usize,
) -> (PooledCache<u64, u64>, Arc<InspectingPool<u64, u64>>) {
  let pool = Arc::new(InspectingPool::new(slots, 4));
  let cache = CacheBuilder::new()
    .max_size_per_shard(max_size)
    .pool_arc(pool.clone())
    .disable_sweeper()
    .record_access_metrics(true)
    .build()
    .unwrap();
  (cache, pool)
}
