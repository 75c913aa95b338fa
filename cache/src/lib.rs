//! A pooled, best-effort concurrent cache for hot paths.
//!
//! Instead of guarding one map with a lock, the cache keeps a pool of small,
//! unsynchronized shards. Each call borrows a shard, works on it alone and
//! hands it back. Threads tend to get the shard they last returned, so the
//! common path touches no contended state at all.
//!
//! # Trade-offs
//! - **Best-effort reads**: different threads may see different shards, so a
//!   `get` can miss a key another thread just wrote, or return an older value
//!   for a key that was evicted elsewhere.
//! - **Bounded shards**: each shard holds about `max_size_per_shard` entries.
//!   Overflow is handled by a rotating probe over the first few positions of
//!   the shard's iteration order, which keeps eviction constant-time.
//! - **Disposable state**: the pool may drop shards at any time, and
//!   [`PooledCache::sweep`] (or a background sweep) clears it entirely.
//!
//! Only cache values that are cheap to recompute and safe to read stale.
//!
//! ```
//! use fibre_pcache::PooledCache;
//!
//! let cache = PooledCache::new(64);
//! let square = cache.get_or_insert_with(12u64, || 12 * 12);
//! assert_eq!(square, 144);
//! ```

// Public modules that form the API
pub mod builder;
pub mod error;
pub mod handles;
pub mod metrics;
pub mod pool;
pub mod shard;

// Internal, crate-only modules
mod shared;
mod task;

// Re-export the primary user-facing types for convenience
pub use builder::CacheBuilder;
pub use error::BuildError;
pub use handles::PooledCache;
pub use metrics::MetricsSnapshot;
pub use pool::{ShardPool, StripedPool};
pub use shard::{InsertOutcome, Shard};
