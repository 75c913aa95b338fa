use crate::metrics::Metrics;
use crate::shard::Shard;

use core::fmt;
use std::cell::Cell;
use std::hash::{BuildHasher, Hash};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

/// The default number of idle shards a single slot of a [`StripedPool`] keeps.
pub const DEFAULT_SHARDS_PER_SLOT: usize = 4;

/// The largest number of free lists a [`StripedPool`] will allocate.
pub const MAX_POOL_SLOTS: usize = 1 << 12;

/// A concurrency-safe supplier and recycler of [`Shard`]s.
///
/// Implementations must never make a caller wait for another caller's
/// `release`. They are free to hand out any idle shard, and to drop shards
/// whenever they see fit; the cache tolerates both.
pub trait ShardPool<K, V, H>: Send + Sync {
  /// Takes an idle shard out of the pool, if one is readily available.
  ///
  /// Returning `None` is always allowed; the cache then builds a fresh shard.
  fn try_acquire(&self) -> Option<Shard<K, V, H>>;

  /// Hands a shard back for reuse. Returns `false` if the pool discarded it.
  fn release(&self, shard: Shard<K, V, H>) -> bool;

  /// Drops every idle shard held by the pool and returns how many were dropped.
  /// Shards currently borrowed are not affected.
  fn sweep(&self) -> usize;

  /// A best-effort count of idle shards currently held.
  fn pooled(&self) -> usize;
}

static NEXT_SLOT_HINT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
  // Each thread is assigned a sticky slot the first time it touches a pool.
  // Threads are spread round-robin, so up to `slots` threads get a free list
  // to themselves.
  static SLOT_HINT: Cell<Option<usize>> = const { Cell::new(None) };
}

#[inline]
fn slot_hint() -> usize {
  SLOT_HINT.with(|hint| match hint.get() {
    Some(h) => h,
    None => {
      let h = NEXT_SLOT_HINT.fetch_add(1, Ordering::Relaxed);
      hint.set(Some(h));
      h
    }
  })
}

/// The default [`ShardPool`]: a fixed array of small, mutex-guarded free lists.
///
/// A thread always starts at its own slot and falls back to one neighbour.
/// Every lock attempt is a `try_lock`, so a contended slot means "nothing
/// available" on acquire and "drop it" on release rather than a wait.
pub struct StripedPool<K, V, H> {
  slots: Box<[CachePadded<Mutex<Vec<Shard<K, V, H>>>>]>,
  mask: usize,
  shards_per_slot: usize,
}

impl<K, V, H> fmt::Debug for StripedPool<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StripedPool")
      .field("slots", &self.slots.len())
      .field("shards_per_slot", &self.shards_per_slot)
      .finish()
  }
}

impl<K, V, H> StripedPool<K, V, H> {
  /// Creates a pool with `slots` free lists (clamped to `1..=MAX_POOL_SLOTS`
  /// and rounded up to a power of two), each holding at most
  /// `shards_per_slot` idle shards.
  pub fn new(slots: usize, shards_per_slot: usize) -> Self {
    let slots = slots.clamp(1, MAX_POOL_SLOTS).next_power_of_two();
    // Free lists grow on release; nothing is reserved up front.
    let slots: Vec<_> = (0..slots)
      .map(|_| CachePadded::new(Mutex::new(Vec::new())))
      .collect();

    Self {
      mask: slots.len() - 1,
      slots: slots.into_boxed_slice(),
      shards_per_slot,
    }
  }

  pub fn slots(&self) -> usize {
    self.slots.len()
  }

  /// The home slot for the calling thread followed by its neighbour.
  #[inline]
  fn candidate_slots(&self) -> [usize; 2] {
    let home = slot_hint() & self.mask;
    [home, (home + 1) & self.mask]
  }
}

impl<K, V, H> ShardPool<K, V, H> for StripedPool<K, V, H>
where
  K: Send,
  V: Send,
  H: Send,
{
  fn try_acquire(&self) -> Option<Shard<K, V, H>> {
    for index in self.candidate_slots() {
      if let Some(mut free) = self.slots[index].try_lock() {
        if let Some(shard) = free.pop() {
          return Some(shard);
        }
      }
    }
    None
  }

  fn release(&self, shard: Shard<K, V, H>) -> bool {
    for index in self.candidate_slots() {
      if let Some(mut free) = self.slots[index].try_lock() {
        if free.len() < self.shards_per_slot {
          free.push(shard);
          return true;
        }
      }
    }
    false
  }

  fn sweep(&self) -> usize {
    let mut dropped = 0;
    for slot in self.slots.iter() {
      // Move the shards out so they are freed after the lock is released.
      let taken = std::mem::take(&mut *slot.lock());
      dropped += taken.len();
    }
    dropped
  }

  fn pooled(&self) -> usize {
    self.slots.iter().map(|slot| slot.lock().len()).sum()
  }
}

/// Builds fresh shards for the cache and fronts the configured pool so that
/// acquiring a shard can never fail.
pub(crate) struct PoolHandle<K, V, H> {
  pub(crate) pool: Arc<dyn ShardPool<K, V, H>>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) max_size: usize,
  pub(crate) probe_boundary: usize,
  pub(crate) hasher: H,
}

impl<K, V, H> fmt::Debug for PoolHandle<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PoolHandle")
      .field("max_size", &self.max_size)
      .field("probe_boundary", &self.probe_boundary)
      .field("pooled", &self.pool.pooled())
      .finish_non_exhaustive()
  }
}

impl<K, V, H> PoolHandle<K, V, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher + Clone,
{
  /// Borrows a shard: a pooled one if available, otherwise a fresh one.
  #[inline]
  pub(crate) fn acquire(&self) -> ShardGuard<'_, K, V, H> {
    let shard = match self.pool.try_acquire() {
      Some(shard) => shard,
      None => self.new_shard(),
    };
    ShardGuard {
      shard: Some(shard),
      handle: self,
    }
  }

  #[cold]
  fn new_shard(&self) -> Shard<K, V, H> {
    self.metrics.shards_created.fetch_add(1, Ordering::Relaxed);
    tracing::trace!(max_size = self.max_size, "building fresh cache shard");
    Shard::new(self.max_size, self.probe_boundary, self.hasher.clone())
  }
}

impl<K, V, H> PoolHandle<K, V, H> {
  #[inline]
  fn release(&self, shard: Shard<K, V, H>) {
    if !self.pool.release(shard) {
      self.metrics.shards_discarded.fetch_add(1, Ordering::Relaxed);
      tracing::trace!("shard pool declined a released shard");
    }
  }
}

/// An RAII borrow of a single shard.
///
/// The shard goes back to the pool when the guard is dropped, including
/// during unwinding.
pub(crate) struct ShardGuard<'a, K, V, H> {
  shard: Option<Shard<K, V, H>>,
  handle: &'a PoolHandle<K, V, H>,
}

impl<'a, K, V, H> Drop for ShardGuard<'a, K, V, H> {
  fn drop(&mut self) {
    if let Some(shard) = self.shard.take() {
      self.handle.release(shard);
    }
  }
}

impl<'a, K, V, H> Deref for ShardGuard<'a, K, V, H> {
  type Target = Shard<K, V, H>;

  fn deref(&self) -> &Self::Target {
    // Only `Drop` takes the shard out.
    match &self.shard {
      Some(shard) => shard,
      None => unreachable!("shard guard used after release"),
    }
  }
}

impl<'a, K, V, H> DerefMut for ShardGuard<'a, K, V, H> {
  fn deref_mut(&mut self) -> &mut Self::Target {
    match &mut self.shard {
      Some(shard) => shard,
      None => unreachable!("shard guard used after release"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::shard::DEFAULT_PROBE_BOUNDARY;
  use std::thread;

  fn shard_with(key: u32) -> Shard<u32, u32, ahash::RandomState> {
    let mut shard = Shard::new(8, DEFAULT_PROBE_BOUNDARY, ahash::RandomState::new());
    shard.insert(key, key);
    shard
  }

  #[test]
  fn slot_count_is_power_of_two() {
    let pool: StripedPool<u32, u32, ahash::RandomState> = StripedPool::new(5, 2);
    assert_eq!(pool.slots(), 8);
    let pool: StripedPool<u32, u32, ahash::RandomState> = StripedPool::new(0, 2);
    assert_eq!(pool.slots(), 1);
    let pool: StripedPool<u32, u32, ahash::RandomState> = StripedPool::new(usize::MAX, 1);
    assert_eq!(pool.slots(), MAX_POOL_SLOTS);
  }

  #[test]
  fn huge_shards_per_slot_reserves_nothing() {
    let pool: StripedPool<u32, u32, ahash::RandomState> = StripedPool::new(2, usize::MAX);
    for i in 0..8 {
      assert!(pool.release(shard_with(i)));
    }
    assert_eq!(pool.pooled(), 8);
  }

  #[test]
  fn released_shard_is_handed_back_to_the_same_thread() {
    let pool: StripedPool<u32, u32, ahash::RandomState> = StripedPool::new(4, 2);
    assert!(pool.try_acquire().is_none());
    assert!(pool.release(shard_with(7)));
    let shard = pool.try_acquire().expect("pooled shard");
    assert_eq!(shard.get(&7), Some(&7));
    assert!(pool.try_acquire().is_none());
  }

  #[test]
  fn release_overflows_into_neighbour_then_discards() {
    let pool: StripedPool<u32, u32, ahash::RandomState> = StripedPool::new(2, 1);
    assert!(pool.release(shard_with(1)));
    assert!(pool.release(shard_with(2)));
    assert!(!pool.release(shard_with(3)));
    assert_eq!(pool.pooled(), 2);
  }

  #[test]
  fn sweep_drops_every_idle_shard() {
    let pool: StripedPool<u32, u32, ahash::RandomState> = StripedPool::new(1, 4);
    for i in 0..3 {
      pool.release(shard_with(i));
    }
    assert_eq!(pool.sweep(), 3);
    assert_eq!(pool.pooled(), 0);
    assert!(pool.try_acquire().is_none());
  }

  #[test]
  fn threads_get_distinct_home_slots() {
    // Other tests draw hints concurrently, so only distinctness is checked:
    // every new thread takes a fresh value from the shared counter.
    let hints: Vec<usize> = (0..4)
      .map(|_| thread::spawn(slot_hint).join().unwrap())
      .collect();
    for pair in hints.windows(2) {
      assert!(pair[1] > pair[0], "hints {hints:?} must strictly increase");
    }

    let pool = Arc::new(StripedPool::<u32, u32, ahash::RandomState>::new(64, 1));
    let (home, hint) = thread::spawn(move || (pool.candidate_slots()[0], slot_hint()))
      .join()
      .unwrap();
    assert_eq!(home, hint & 63);
  }

  #[test]
  fn guard_releases_on_drop() {
    let metrics = Arc::new(Metrics::new());
    let handle = PoolHandle {
      pool: Arc::new(StripedPool::<u32, u32, ahash::RandomState>::new(1, 1)),
      metrics: metrics.clone(),
      max_size: 4,
      probe_boundary: DEFAULT_PROBE_BOUNDARY,
      hasher: ahash::RandomState::new(),
    };
    {
      let mut guard = handle.acquire();
      guard.insert(1u32, 1u32);
    }
    assert_eq!(handle.pool.pooled(), 1);
    assert_eq!(handle.acquire().get(&1), Some(&1));
    assert_eq!(metrics.shards_created.load(Ordering::Relaxed), 1);
  }
}
