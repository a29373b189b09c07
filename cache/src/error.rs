use thiserror::Error;

use latchkey::LockError;

use crate::row::ColumnType;

/// The error type a mapping callback may fail with.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned while populating the cache or applying a mutation.
///
/// Cache drift (an index entry without its result list, or the reverse) is
/// not an error; it is repaired or skipped.
#[derive(Debug, Error)]
pub enum CacheError {
  /// A registered mapping callback failed while describing a mutation.
  #[error("mapping callback for region '{region}' failed: {source}")]
  Callback {
    region: String,
    #[source]
    source: CallbackError,
  },

  #[error("result row has {found} columns but the cached shape declares {expected}")]
  ArityMismatch { expected: usize, found: usize },

  #[error("column {column} expects {expected} but got {found}")]
  ColumnMismatch {
    column: usize,
    expected: ColumnType,
    found: &'static str,
  },

  /// The locked section could not be entered, e.g. because it was interrupted.
  #[error(transparent)]
  Lock(#[from] LockError),
}

/// Errors that can occur when building a region store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  #[error("region name cannot be empty")]
  EmptyRegionName,
  /// The region was configured with zero shards.
  #[error("shard count cannot be zero")]
  ZeroShards,
  /// A bounded region was configured with a capacity of zero.
  #[error("bounded region capacity cannot be zero")]
  ZeroCapacity,
}
