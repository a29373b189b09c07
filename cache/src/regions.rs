use core::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::query_cache::QueryCache;
use crate::store::{MemoryRegion, RegionStore};

/// Creates the backing store of a newly requested region.
pub type StoreFactory = Arc<dyn Fn(&str) -> Arc<dyn RegionStore> + Send + Sync>;

/// The named query cache regions of an application.
///
/// Regions are created on first request. The listener only updates regions
/// that already exist, so a region nobody has read from is never touched.
pub struct QueryCacheRegions {
  caches: DashMap<String, Arc<QueryCache>, ahash::RandomState>,
  factory: StoreFactory,
}

impl fmt::Debug for QueryCacheRegions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryCacheRegions")
      .field("regions", &self.caches.len())
      .finish_non_exhaustive()
  }
}

impl Default for QueryCacheRegions {
  fn default() -> Self {
    Self::with_store_factory(|name| Arc::new(MemoryRegion::new(name)) as Arc<dyn RegionStore>)
  }
}

impl QueryCacheRegions {
  /// Regions backed by unbounded [`MemoryRegion`]s.
  pub fn new() -> Self {
    Self::default()
  }

  /// Regions backed by stores from `factory`.
  ///
  /// The factory runs while the region table is locked for that name and
  /// must not call back into these regions.
  pub fn with_store_factory<F>(factory: F) -> Self
  where
    F: Fn(&str) -> Arc<dyn RegionStore> + Send + Sync + 'static,
  {
    Self {
      caches: DashMap::default(),
      factory: Arc::new(factory),
    }
  }

  /// Returns the cache of region `name`, creating it if needed.
  pub fn query_cache(&self, name: &str) -> Arc<QueryCache> {
    if let Some(cache) = self.caches.get(name) {
      return cache.clone();
    }
    self
      .caches
      .entry(name.to_owned())
      .or_insert_with(|| {
        debug!(region = name, "creating query cache region");
        Arc::new(QueryCache::new((self.factory)(name)))
      })
      .clone()
  }

  /// Returns the cache of region `name` if it was already created.
  pub fn get(&self, name: &str) -> Option<Arc<QueryCache>> {
    self.caches.get(name).map(|cache| cache.clone())
  }

  pub fn region_names(&self) -> Vec<String> {
    let mut names: Vec<_> = self.caches.iter().map(|entry| entry.key().clone()).collect();
    names.sort();
    names
  }

  /// Clears every region, keeping the regions themselves.
  pub fn evict_all(&self) {
    for entry in self.caches.iter() {
      debug!(region = %entry.key(), "evicting query cache region");
      entry.value().clear();
    }
  }
}
