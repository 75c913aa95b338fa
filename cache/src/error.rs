use std::fmt;

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// The eviction probe was configured with a boundary of zero, leaving it no
  /// positions to visit.
  ZeroProbeBoundary,
  /// A background sweep was requested with a zero interval.
  ZeroSweepInterval,
  /// The default pool was configured to keep zero idle shards per slot, which
  /// would discard every shard on release.
  ZeroShardsPerSlot,
  /// The default pool was configured with more free lists than it supports.
  TooManySlots { requested: usize, max: usize },
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::ZeroProbeBoundary => write!(f, "probe boundary cannot be zero"),
      BuildError::ZeroSweepInterval => write!(f, "sweep interval cannot be zero"),
      BuildError::ZeroShardsPerSlot => write!(f, "shards per pool slot cannot be zero"),
      BuildError::TooManySlots { requested, max } => {
        write!(f, "pool slot count {requested} exceeds the maximum of {max}")
      }
    }
  }
}

impl std::error::Error for BuildError {}
