use fibre_pcache::{CacheBuilder, Shard, ShardPool};
use parking_lot::Mutex;

// A pool with a single shared free list. Simpler than the default striped
// pool, but every acquire and release goes through the same lock.
struct SingleListPool<K, V> {
  free: Mutex<Vec<Shard<K, V>>>,
  limit: usize,
}

impl<K: Send, V: Send> ShardPool<K, V, ahash::RandomState> for SingleListPool<K, V> {
  fn try_acquire(&self) -> Option<Shard<K, V>> {
    self.free.try_lock()?.pop()
  }

  fn release(&self, shard: Shard<K, V>) -> bool {
    match self.free.try_lock() {
      Some(mut free) if free.len() < self.limit => {
        free.push(shard);
        true
      }
      _ => false,
    }
  }

  fn sweep(&self) -> usize {
    std::mem::take(&mut *self.free.lock()).len()
  }

  fn pooled(&self) -> usize {
    self.free.lock().len()
  }
}

fn main() {
  println!("--- Cache with a custom shard pool ---");

  let cache = CacheBuilder::<i32, String>::default()
    .max_size_per_shard(3)
    .pool(SingleListPool {
      free: Mutex::new(Vec::new()),
      limit: 2,
    })
    .record_access_metrics(true)
    .build()
    .expect("Failed to build cache");

  for i in 0..5 {
    cache.insert(i, format!("value-{}", i));
  }

  // Only three of the five keys fit in the shard.
  for i in 0..5 {
    match cache.get(&i) {
      Some(value) => println!("key {} -> {}", i, value),
      None => println!("key {} was evicted", i),
    }
  }

  println!("\nSwept {} idle shard(s).", cache.sweep());
  println!("Cache metrics: {:#?}", cache.metrics());
}
