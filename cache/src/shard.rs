use core::fmt;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// The default upper bound on how far into a shard's iteration order the
/// eviction probe may reach.
pub const DEFAULT_PROBE_BOUNDARY: usize = 10;

/// The result of a [`Shard::insert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  /// The key was new and the shard had room for it.
  Inserted,
  /// The key was already present; its value was overwritten.
  Replaced,
  /// The key was new; one existing entry was evicted to make room.
  Evicted,
  /// The key was new and the shard was full, but the probe landed past the
  /// end of the entry set and nothing was evicted.
  ProbeMissed,
}

/// A single unsynchronized storage unit of the cache.
///
/// A shard is only ever touched through `&mut self` by whichever caller has it
/// borrowed from the pool, so it carries no locks of its own. Its size is kept
/// near `max_size` by a bounded probe: when a new key arrives at a full shard,
/// a rotating cursor in `[0, probe_boundary)` picks which entry, by iteration
/// position, is dropped.
pub struct Shard<K, V, H = ahash::RandomState> {
  entries: HashMap<K, V, H>,
  probe_index: usize,
  probe_boundary: usize,
  max_size: usize,
}

impl<K, V, H> fmt::Debug for Shard<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Shard")
      .field("len", &self.entries.len())
      .field("max_size", &self.max_size)
      .field("probe_index", &self.probe_index)
      .field("probe_boundary", &self.probe_boundary)
      .finish()
  }
}

/// Clamps a configured probe boundary against the shard capacity.
///
/// The result is never zero, so a zero-capacity shard still has a valid
/// cursor range of `[0, 1)`.
#[inline]
pub(crate) fn effective_probe_boundary(configured: usize, max_size: usize) -> usize {
  configured.min(max_size).max(1)
}

impl<K, V, H> Shard<K, V, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher,
{
  /// Creates an empty shard.
  ///
  /// `probe_boundary` is clamped to `max(1, min(probe_boundary, max_size))`.
  pub fn new(max_size: usize, probe_boundary: usize, hasher: H) -> Self {
    Self {
      entries: HashMap::with_hasher(hasher),
      probe_index: 0,
      probe_boundary: effective_probe_boundary(probe_boundary, max_size),
      max_size,
    }
  }

  #[inline]
  pub fn get<Q>(&self, key: &Q) -> Option<&V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.entries.get(key)
  }

  #[inline]
  pub fn contains_key<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.entries.contains_key(key)
  }

  /// Inserts or overwrites an entry.
  ///
  /// If `key` is new and the shard already holds `max_size` or more entries,
  /// exactly one probe step runs before the entry is placed. The entry being
  /// written is therefore never its own victim.
  pub fn insert(&mut self, key: K, value: V) -> InsertOutcome {
    if let Some(slot) = self.entries.get_mut(&key) {
      *slot = value;
      return InsertOutcome::Replaced;
    }

    let outcome = if self.entries.len() >= self.max_size {
      if self.evict_one() {
        InsertOutcome::Evicted
      } else {
        InsertOutcome::ProbeMissed
      }
    } else {
      InsertOutcome::Inserted
    };

    self.entries.insert(key, value);
    outcome
  }

  /// Advances the probe cursor and removes the entry sitting at that position
  /// in the map's iteration order. Returns `false` if the map is too short for
  /// the cursor to land on anything.
  fn evict_one(&mut self) -> bool {
    self.probe_index = (self.probe_index + 1) % self.probe_boundary;

    let victim = match self.entries.keys().nth(self.probe_index) {
      Some(k) => k.clone(),
      None => return false,
    };
    self.entries.remove(&victim).is_some()
  }

  pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.entries.remove(key)
  }
}

impl<K, V, H> Shard<K, V, H> {
  #[inline]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn max_size(&self) -> usize {
    self.max_size
  }

  pub fn probe_boundary(&self) -> usize {
    self.probe_boundary
  }

  #[cfg(test)]
  pub(crate) fn probe_index(&self) -> usize {
    self.probe_index
  }
}
