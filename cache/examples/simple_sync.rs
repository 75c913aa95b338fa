use fibre_pcache::CacheBuilder;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
  // Install a subscriber so the sweeper's debug events are visible.
  tracing_subscriber::fmt()
    .with_env_filter("fibre_pcache=debug")
    .init();

  // Each shard keeps about 32 entries; the whole pool is cleared every second.
  let cache = Arc::new(
    CacheBuilder::default()
      .max_size_per_shard(32)
      .sweep_interval(Duration::from_secs(1))
      .record_access_metrics(true)
      .build()
      .expect("Failed to build cache"),
  );

  println!("Inserting ('key1', 100) into the cache.");
  cache.insert("key1".to_string(), 100);

  match cache.get("key1") {
    Some(value) => println!("Found value for key1: {}", value),
    None => println!("Value for key1 not found."),
  }

  // Four threads memoizing the same function. Each mostly works on its own
  // shard, so some of them compute a value another thread already cached.
  let handles: Vec<_> = (0..4)
    .map(|t| {
      let cache = cache.clone();
      thread::spawn(move || {
        for n in 0..1_000u64 {
          let key = format!("square-{}", n % 40);
          let value = cache.get_or_insert_with(key, || ((n % 40) * (n % 40)) as i32);
          assert_eq!(value as u64, (n % 40) * (n % 40), "thread {t}");
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().expect("worker panicked");
  }

  println!("\nCache metrics: {:#?}", cache.metrics());

  println!("\nWaiting for the sweeper to clear the pool...");
  thread::sleep(Duration::from_millis(1_500));

  match cache.get("key1") {
    Some(value) => println!("Found value for key1: {}", value),
    None => println!("Value for key1 not found (as expected after a sweep)."),
  }

  println!("\nCache metrics after sweep: {:#?}", cache.metrics());
}
