use crate::metrics::Metrics;
use crate::pool::ShardPool;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Discards every idle shard in `pool` and records the sweep.
pub(crate) fn sweep_pool<K, V, H>(pool: &dyn ShardPool<K, V, H>, metrics: &Metrics) -> usize {
  let dropped = pool.sweep();
  metrics.sweeps.fetch_add(1, Ordering::Relaxed);
  if dropped > 0 {
    tracing::debug!(dropped, "swept idle cache shards");
  }
  dropped
}

#[derive(Debug, Default)]
struct StopSignal {
  stopped: Mutex<bool>,
  wakeup: Condvar,
}

/// The background task that periodically clears the shard pool, bounding how
/// long stale entries can linger in idle shards.
#[derive(Debug)]
pub(crate) struct Sweeper {
  handle: Option<JoinHandle<()>>,
  signal: Arc<StopSignal>,
}

impl Sweeper {
  /// Spawns a new sweeper thread.
  pub(crate) fn spawn<K, V, H>(
    pool: Arc<dyn ShardPool<K, V, H>>,
    metrics: Arc<Metrics>,
    interval: Duration,
  ) -> Self
  where
    K: 'static,
    V: 'static,
    H: 'static,
  {
    let signal = Arc::new(StopSignal::default());
    let thread_signal = signal.clone();

    let handle = thread::Builder::new()
      .name("pcache-sweeper".into())
      .spawn(move || {
        tracing::debug!(?interval, "cache sweeper started");
        let mut stopped = thread_signal.stopped.lock();
        while !*stopped {
          let timed_out = thread_signal
            .wakeup
            .wait_for(&mut stopped, interval)
            .timed_out();
          if *stopped {
            break;
          }
          if timed_out {
            // Release the stop lock while sweeping so `stop` never waits on it.
            drop(stopped);
            sweep_pool(&*pool, &metrics);
            stopped = thread_signal.stopped.lock();
          }
        }
        tracing::debug!("cache sweeper stopped");
      });

    let handle = match handle {
      Ok(handle) => Some(handle),
      Err(err) => {
        tracing::warn!(%err, "failed to spawn cache sweeper; idle shards will only be swept manually");
        None
      }
    };

    Self { handle, signal }
  }

  /// Signals the thread to stop and waits for it to exit.
  pub(crate) fn stop(mut self) {
    self.shutdown();
  }

  fn shutdown(&mut self) {
    *self.signal.stopped.lock() = true;
    self.signal.wakeup.notify_all();
    if let Some(handle) = self.handle.take() {
      let _ = handle.join();
    }
  }
}

impl Drop for Sweeper {
  fn drop(&mut self) {
    self.shutdown();
  }
}
