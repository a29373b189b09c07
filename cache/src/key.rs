use std::fmt;
use std::sync::Arc;

use crate::bindings::ParameterBindings;
use crate::row::ResultShape;

/// The primary cache key of one query result: the query text and the values
/// it was executed with.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryKey {
  query: Arc<str>,
  bindings: ParameterBindings,
}

impl QueryKey {
  pub fn new(query: impl Into<Arc<str>>, bindings: ParameterBindings) -> Self {
    Self {
      query: query.into(),
      bindings,
    }
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn bindings(&self) -> &ParameterBindings {
    &self.bindings
  }
}

impl fmt::Debug for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "QueryKey({:?}, {})", self.query, self.bindings)
  }
}

/// Where the cached result for a set of bindings lives and how its rows look.
///
/// This is the value of a secondary index entry. It never changes once
/// written; a repopulated result simply writes a new descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheEntryDescriptor {
  key: QueryKey,
  shape: ResultShape,
}

impl CacheEntryDescriptor {
  pub fn new(key: QueryKey, shape: ResultShape) -> Self {
    Self { key, shape }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn shape(&self) -> &ResultShape {
    &self.shape
  }
}
