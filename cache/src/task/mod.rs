//! Background tasks for the cache. Currently only the sweeper, which
//! periodically clears the shard pool.

pub(crate) mod sweeper;
