use crate::builder::CacheBuilder;
use crate::metrics::MetricsSnapshot;
use crate::shared::CacheShared;
use crate::task::sweeper::sweep_pool;

use core::fmt;
use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// A thread-safe, best-effort cache built from pooled shards.
///
/// Every call borrows one shard from the pool, works on it without any lock
/// held, and hands it back before returning. Different threads usually work
/// on different shards, so:
///
/// - a value written by one thread may be invisible to another;
/// - a key evicted from one shard may still be served, possibly with an older
///   value, by a different shard;
/// - anything may disappear at any time when the pool drops or sweeps shards.
///
/// Use it only for data that is cheap to recompute and safe to read stale,
/// such as memoized results of pure functions.
///
/// `PooledCache` is a cheap handle; clones share the same pool.
pub struct PooledCache<K, V, H = ahash::RandomState> {
  pub(crate) shared: Arc<CacheShared<K, V, H>>,
}

impl<K, V, H> fmt::Debug for PooledCache<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PooledCache")
      .field("shared", &self.shared)
      .finish()
  }
}

impl<K, V, H> Clone for PooledCache<K, V, H> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<K, V> PooledCache<K, V, ahash::RandomState>
where
  K: Eq + Hash + Clone + Send + 'static,
  V: Send + 'static,
{
  /// Creates a cache whose shards each hold about `max_size_per_shard`
  /// entries, with every other setting at its default. In particular a
  /// background sweeper clears the pool every
  /// [`DEFAULT_SWEEP_INTERVAL`](crate::builder::DEFAULT_SWEEP_INTERVAL).
  ///
  /// A capacity of zero is valid and yields a cache in which every write of a
  /// new key evicts whatever the borrowed shard held.
  pub fn new(max_size_per_shard: usize) -> Self {
    let builder = CacheBuilder::new().max_size_per_shard(max_size_per_shard);
    // The defaults cannot fail validation.
    match builder.build() {
      Ok(cache) => cache,
      Err(err) => unreachable!("default cache configuration rejected: {err}"),
    }
  }

  /// Returns a builder for fine-grained configuration.
  pub fn builder() -> CacheBuilder<K, V, ahash::RandomState> {
    CacheBuilder::new()
  }
}

impl<K, V, H> PooledCache<K, V, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher + Clone,
{
  /// Returns a clone of the value for `key` held by the borrowed shard.
  ///
  /// `None` is an ordinary outcome: the key may never have been written, may
  /// have been evicted, or may live only in a shard another thread holds.
  pub fn get<Q>(&self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    V: Clone,
  {
    let found = {
      let shard = self.shared.pool.acquire();
      shard.get(key).cloned()
    };
    self.shared.record_lookup(found.is_some());
    found
  }

  /// Alias for [`get`](Self::get).
  #[inline]
  pub fn load<Q>(&self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    V: Clone,
  {
    self.get(key)
  }

  /// Looks up `key` and, if found, applies `f` to the value in place.
  ///
  /// This avoids cloning the value. `f` runs while the shard is borrowed, so
  /// it should be short.
  pub fn get_with<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    F: FnOnce(&V) -> R,
  {
    let result = {
      let shard = self.shared.pool.acquire();
      shard.get(key).map(f)
    };
    self.shared.record_lookup(result.is_some());
    result
  }

  /// Writes `value` under `key` in the borrowed shard, overwriting any
  /// previous value there.
  ///
  /// If the shard is full and `key` is new, one existing entry is evicted
  /// first.
  pub fn insert(&self, key: K, value: V) {
    let outcome = {
      let mut shard = self.shared.pool.acquire();
      shard.insert(key, value)
    };
    self.shared.record_insert(outcome);
  }

  /// Alias for [`insert`](Self::insert).
  #[inline]
  pub fn store(&self, key: K, value: V) {
    self.insert(key, value)
  }

  /// Returns the cached value for `key`, or computes it with `init`, stores
  /// it and returns it.
  ///
  /// No shard is borrowed while `init` runs, so concurrent callers may each
  /// compute the value. That is harmless for the pure computations this cache
  /// is meant for.
  pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
  where
    V: Clone,
    F: FnOnce() -> V,
  {
    if let Some(value) = self.get(&key) {
      return value;
    }
    let value = init();
    self.insert(key, value.clone());
    value
  }

  /// Removes `key` from the borrowed shard and returns its value.
  ///
  /// Other shards may still hold the key, so a later `get` can still find it.
  pub fn remove<Q>(&self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let mut shard = self.shared.pool.acquire();
    shard.remove(key)
  }
}

impl<K, V, H> PooledCache<K, V, H> {
  /// Drops every idle shard in the pool and returns how many were dropped.
  ///
  /// Shards borrowed at that moment survive and return to the pool afterwards.
  pub fn sweep(&self) -> usize {
    sweep_pool(&*self.shared.pool.pool, &self.shared.metrics)
  }

  /// The number of idle shards currently held by the pool.
  pub fn pooled_shards(&self) -> usize {
    self.shared.pool.pool.pooled()
  }

  pub fn max_size_per_shard(&self) -> usize {
    self.shared.pool.max_size
  }

  /// The effective probe boundary, after clamping against the shard capacity.
  pub fn probe_boundary(&self) -> usize {
    self.shared.pool.probe_boundary
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }
}
