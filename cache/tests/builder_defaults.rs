use fibre_pcache::builder::{DEFAULT_MAX_SIZE_PER_SHARD, DEFAULT_SWEEP_INTERVAL};
use fibre_pcache::pool::MAX_POOL_SLOTS;
use fibre_pcache::shard::DEFAULT_PROBE_BOUNDARY;
use fibre_pcache::{BuildError, CacheBuilder, PooledCache};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_default_builder_produces_a_working_cache() {
  let cache = CacheBuilder::<i32, i32>::default().build().unwrap();
  assert_eq!(cache.max_size_per_shard(), DEFAULT_MAX_SIZE_PER_SHARD);
  assert_eq!(cache.probe_boundary(), DEFAULT_PROBE_BOUNDARY);

  cache.insert(1, 1);
  assert_eq!(cache.get(&1), Some(1));
}

#[test]
fn test_new_shortcut_matches_builder() {
  let cache: PooledCache<i32, i32> = PooledCache::new(80);
  assert_eq!(cache.max_size_per_shard(), 80);
  assert_eq!(cache.probe_boundary(), 10);

  let built = PooledCache::<i32, i32>::builder()
    .max_size_per_shard(80)
    .probe_boundary(8)
    .build()
    .unwrap();
  assert_eq!(built.probe_boundary(), 8);
}

#[test]
fn test_zero_capacity_is_accepted() {
  let cache: PooledCache<i32, i32> = PooledCache::new(0);
  assert_eq!(cache.max_size_per_shard(), 0);
  assert_eq!(cache.probe_boundary(), 1);
  cache.insert(1, 1);
  cache.insert(2, 2);
  assert_eq!(cache.get(&2), Some(2));
  assert_eq!(cache.get(&1), None);
}

#[test]
fn test_invalid_configurations_are_rejected() {
  let err = CacheBuilder::<i32, i32>::new()
    .probe_boundary(0)
    .build()
    .unwrap_err();
  assert_eq!(err, BuildError::ZeroProbeBoundary);

  let err = CacheBuilder::<i32, i32>::new()
    .sweep_interval(Duration::ZERO)
    .build()
    .unwrap_err();
  assert_eq!(err, BuildError::ZeroSweepInterval);

  let err = CacheBuilder::<i32, i32>::new()
    .shards_per_slot(0)
    .build()
    .unwrap_err();
  assert_eq!(err, BuildError::ZeroShardsPerSlot);
  assert_eq!(err.to_string(), "shards per pool slot cannot be zero");
}

#[test]
fn test_oversized_pool_settings_are_rejected_or_accepted_without_panicking() {
  let err = CacheBuilder::<u32, u32>::new()
    .slots(usize::MAX)
    .build()
    .unwrap_err();
  assert_eq!(
    err,
    BuildError::TooManySlots {
      requested: usize::MAX,
      max: MAX_POOL_SLOTS
    }
  );

  // A huge idle-shard cap is only an upper bound; nothing is reserved for it.
  let cache = CacheBuilder::<u32, u32>::new()
    .shards_per_slot(usize::MAX)
    .build()
    .unwrap();
  cache.insert(1, 1);
  assert_eq!(cache.get(&1), Some(1));

  let cache = CacheBuilder::<u32, u32>::new()
    .slots(MAX_POOL_SLOTS)
    .shards_per_slot(1 << 20)
    .build()
    .unwrap();
  cache.insert(2, 2);
  assert_eq!(cache.get(&2), Some(2));
}

#[test]
fn test_new_cache_sweeps_itself_by_default() {
  let cache: PooledCache<i32, i32> = PooledCache::new(8);
  cache.insert(1, 1);
  assert_eq!(cache.get(&1), Some(1));

  let deadline = Instant::now() + DEFAULT_SWEEP_INTERVAL * 5;
  while cache.metrics().sweeps == 0 && Instant::now() < deadline {
    thread::sleep(Duration::from_millis(10));
  }
  assert!(cache.metrics().sweeps >= 1, "no sweep ran within the default interval");
  assert_eq!(cache.get(&1), None, "a swept cache forgets its entries");
}

#[test]
fn test_disabled_sweeper_keeps_entries() {
  let cache = CacheBuilder::<i32, i32>::new()
    .disable_sweeper()
    .build()
    .unwrap();
  cache.insert(1, 1);
  thread::sleep(DEFAULT_SWEEP_INTERVAL + Duration::from_millis(200));
  assert_eq!(cache.metrics().sweeps, 0);
  assert_eq!(cache.get(&1), Some(1));
}

#[test]
fn test_single_slot_pool_reuses_one_shard() {
  let cache = CacheBuilder::<i32, i32>::new()
    .slots(1)
    .shards_per_slot(1)
    .disable_sweeper()
    .build()
    .unwrap();

  for i in 0..10 {
    cache.insert(i, i);
  }
  assert_eq!(cache.pooled_shards(), 1);
  assert_eq!(cache.metrics().shards_created, 1);
}
