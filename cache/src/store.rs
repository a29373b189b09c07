use crate::bindings::ParameterBindings;
use crate::error::BuildError;
use crate::key::{CacheEntryDescriptor, QueryKey};
use crate::row::CachedResultList;

use core::fmt;
use std::collections::HashMap;

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use tracing::trace;

/// A key in a cache region.
///
/// Primary result lists and secondary index entries share one region, and
/// so one eviction domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
  /// The cached result list of a query.
  Query(QueryKey),
  /// The secondary index entry for a set of bindings.
  Index(ParameterBindings),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreValue {
  Results(CachedResultList),
  Index(CacheEntryDescriptor),
}

/// The backing key/value capability of one cache region.
///
/// Implementations must be safe to call concurrently and may evict any entry
/// at any time, without coordinating primary and index entries.
pub trait RegionStore: Send + Sync {
  fn name(&self) -> &str;

  fn get(&self, key: &StoreKey) -> Option<StoreValue>;

  fn put(&self, key: StoreKey, value: StoreValue);

  /// Removes one entry. Returns `true` if it was present.
  fn evict(&self, key: &StoreKey) -> bool;

  fn clear(&self);

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

type Shard = RwLock<HashMap<StoreKey, StoreValue, ahash::RandomState>>;

/// An in-memory region partitioned into independently locked shards.
///
/// A region may be bounded. When a bounded shard is full, inserting a new key
/// evicts an arbitrary resident entry of that shard, whatever its kind.
pub struct MemoryRegion {
  name: String,
  shards: Box<[CachePadded<Shard>]>,
  hasher: ahash::RandomState,
  shard_capacity: Option<usize>,
}

impl fmt::Debug for MemoryRegion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MemoryRegion")
      .field("name", &self.name)
      .field("num_shards", &self.shards.len())
      .field("shard_capacity", &self.shard_capacity)
      .finish()
  }
}

impl MemoryRegion {
  /// Creates an unbounded region with the default shard count.
  pub fn new(name: impl Into<String>) -> Self {
    let name = name.into();
    Self::with_layout(name, DEFAULT_SHARDS, None)
  }

  pub fn builder(name: impl Into<String>) -> MemoryRegionBuilder {
    MemoryRegionBuilder {
      name: name.into(),
      shards: DEFAULT_SHARDS,
      capacity: None,
    }
  }

  fn with_layout(name: String, num_shards: usize, capacity: Option<usize>) -> Self {
    let hasher = ahash::RandomState::new();
    let mut shards = Vec::with_capacity(num_shards);
    for _ in 0..num_shards {
      let shard_map = HashMap::with_hasher(hasher.clone());
      shards.push(CachePadded::new(RwLock::new(shard_map)));
    }

    Self {
      name,
      shards: shards.into_boxed_slice(),
      hasher,
      shard_capacity: capacity.map(|total| total / num_shards),
    }
  }

  /// Returns the shard guarding `key`.
  #[inline]
  fn shard(&self, key: &StoreKey) -> &Shard {
    let hash = self.hasher.hash_one(key);
    // `num_shards` is a non-zero power of two.
    let index = hash as usize & (self.shards.len() - 1);
    &self.shards[index]
  }
}

impl RegionStore for MemoryRegion {
  fn name(&self) -> &str {
    &self.name
  }

  fn get(&self, key: &StoreKey) -> Option<StoreValue> {
    self.shard(key).read().get(key).cloned()
  }

  fn put(&self, key: StoreKey, value: StoreValue) {
    let mut shard = self.shard(&key).write();
    if let Some(limit) = self.shard_capacity {
      if shard.len() >= limit && !shard.contains_key(&key) {
        let victim = shard.keys().next().cloned();
        if let Some(victim) = victim {
          trace!(region = %self.name, ?victim, "evicting entry from full shard");
          shard.remove(&victim);
        }
      }
    }
    shard.insert(key, value);
  }

  fn evict(&self, key: &StoreKey) -> bool {
    self.shard(key).write().remove(key).is_some()
  }

  fn clear(&self) {
    for shard in self.shards.iter() {
      shard.write().clear();
    }
  }

  fn len(&self) -> usize {
    self.shards.iter().map(|shard| shard.read().len()).sum()
  }
}

const DEFAULT_SHARDS: usize = 16;

/// A builder for [`MemoryRegion`].
#[derive(Debug, Clone)]
pub struct MemoryRegionBuilder {
  name: String,
  shards: usize,
  capacity: Option<usize>,
}

impl MemoryRegionBuilder {
  /// Sets the number of shards. Rounded up to a power of two.
  pub fn shards(mut self, shards: usize) -> Self {
    self.shards = shards;
    self
  }

  /// Bounds the total number of entries, index entries included.
  ///
  /// The bound is split evenly across shards. A capacity smaller than the
  /// shard count reduces the shard count, and a capacity that does not divide
  /// evenly holds up to one entry less per shard.
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.capacity = Some(capacity);
    self
  }

  pub fn build(self) -> Result<MemoryRegion, BuildError> {
    if self.name.is_empty() {
      return Err(BuildError::EmptyRegionName);
    }
    if self.shards == 0 {
      return Err(BuildError::ZeroShards);
    }
    if self.capacity == Some(0) {
      return Err(BuildError::ZeroCapacity);
    }
    let mut shards = self.shards.next_power_of_two();
    if let Some(capacity) = self.capacity {
      // Largest power of two not above the capacity, so every shard holds at least one entry.
      let fitting = 1usize << capacity.ilog2();
      shards = shards.min(fitting);
    }
    Ok(MemoryRegion::with_layout(self.name, shards, self.capacity))
  }
}
