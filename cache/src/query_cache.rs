use std::fmt;
use std::sync::Arc;

use latchkey::{Interrupt, ParameterLockIndex};
use tracing::{debug, warn};

use crate::bindings::ParameterBindings;
use crate::error::CacheError;
use crate::key::{CacheEntryDescriptor, QueryKey};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::row::{CachedResultList, ResultRow, ResultShape};
use crate::store::{RegionStore, StoreKey, StoreValue};
use crate::value::Value;

/// How a mutation changes the cached result list it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
  /// Append the row.
  Add,
  /// Remove the first row equal to it.
  Remove,
  /// Empty the list of a unique query, then keep the row if `add` is set.
  ///
  /// The list is emptied whatever its previous size, so stale rows that
  /// accumulated through drift are discarded too.
  ReplaceUnique { add: bool },
}

/// One incremental change to the cached result of a set of bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
  pub bindings: ParameterBindings,
  pub row: ResultRow,
  pub kind: MutationKind,
}

impl Mutation {
  pub fn new(bindings: ParameterBindings, row: impl Into<ResultRow>, kind: MutationKind) -> Self {
    Self {
      bindings,
      row: row.into(),
      kind,
    }
  }
}

/// Whether and how [`QueryCache::apply_mutation`] serializes against other writers.
#[derive(Debug, Clone, Copy)]
pub enum MutationLock<'a> {
  /// The caller guarantees a single writer for these bindings.
  Unlocked,
  /// Lock the bindings' values, waiting as long as it takes.
  Blocking(&'a ParameterLockIndex<Value>),
  /// Lock the bindings' values, giving up once the interrupt is raised.
  Interruptible(&'a ParameterLockIndex<Value>, &'a Interrupt),
}

/// A query result cache region that keeps a secondary index from parameter
/// bindings to the cached result, so entity mutations can update cached
/// results in place instead of invalidating the whole region.
///
/// The primary entries and the index share one [`RegionStore`] and may be
/// evicted independently. Lookups repair a missing index entry; mutations
/// that find no index entry, or an index entry without its list, do nothing.
pub struct QueryCache {
  store: Arc<dyn RegionStore>,
  metrics: Metrics,
}

impl fmt::Debug for QueryCache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryCache")
      .field("region", &self.store.name())
      .field("metrics", &self.metrics.snapshot())
      .finish()
  }
}

impl QueryCache {
  pub fn new(store: Arc<dyn RegionStore>) -> Self {
    Self {
      store,
      metrics: Metrics::new(),
    }
  }

  pub fn region_name(&self) -> &str {
    self.store.name()
  }

  pub fn store(&self) -> &Arc<dyn RegionStore> {
    &self.store
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.metrics.snapshot()
  }

  /// Caches a freshly computed result and indexes it by the key's bindings.
  ///
  /// The index write takes no lock; concurrent populations of the same
  /// bindings resolve last-write-wins.
  pub fn put(&self, key: QueryKey, shape: ResultShape, rows: &[ResultRow]) -> Result<(), CacheError> {
    let rows = rows
      .iter()
      .map(|row| shape.disassemble(row))
      .collect::<Result<Vec<_>, _>>()?;

    debug!(region = %self.region_name(), bindings = %key.bindings(), rows = rows.len(), "caching query result");
    self
      .store
      .put(StoreKey::Query(key.clone()), StoreValue::Results(CachedResultList::new(rows)));
    Metrics::bump(&self.metrics.puts);

    let bindings = key.bindings().clone();
    self.on_populate(bindings, CacheEntryDescriptor::new(key, shape));
    Ok(())
  }

  /// Records the secondary index entry for `bindings`.
  pub fn on_populate(&self, bindings: ParameterBindings, descriptor: CacheEntryDescriptor) {
    self.store.put(StoreKey::Index(bindings), StoreValue::Index(descriptor));
  }

  /// Looks up the cached result for `key`.
  ///
  /// When the result is present but its index entry is gone, the entry is
  /// re-created from `key` and `shape`.
  pub fn get(&self, key: &QueryKey, shape: &ResultShape) -> Option<CachedResultList> {
    let result = self.results(&StoreKey::Query(key.clone()));
    let indexed = self.index_entry(key.bindings()).is_some();
    debug!(
      region = %self.region_name(),
      bindings = %key.bindings(),
      hit = result.is_some(),
      "query cache lookup"
    );

    match result {
      Some(list) => {
        Metrics::bump(&self.metrics.hits);
        if !indexed {
          warn!(
            region = %self.region_name(),
            bindings = %key.bindings(),
            "index entry was evicted before its cached result, re-creating it"
          );
          Metrics::bump(&self.metrics.index_repairs);
          self.on_populate(
            key.bindings().clone(),
            CacheEntryDescriptor::new(key.clone(), shape.clone()),
          );
        }
        Some(list)
      }
      None => {
        Metrics::bump(&self.metrics.misses);
        None
      }
    }
  }

  /// Returns the secondary index entry for `bindings`, if any.
  pub fn index_entry(&self, bindings: &ParameterBindings) -> Option<CacheEntryDescriptor> {
    match self.store.get(&StoreKey::Index(bindings.clone()))? {
      StoreValue::Index(descriptor) => Some(descriptor),
      StoreValue::Results(_) => None,
    }
  }

  /// Applies one mutation to the cached result of its bindings.
  ///
  /// Returns `Ok(true)` if a cached list was rewritten and `Ok(false)` if
  /// nothing was cached for the bindings. Any lock taken is released before
  /// this returns, on success and on error alike.
  pub fn apply_mutation(&self, mutation: &Mutation, lock: MutationLock<'_>) -> Result<bool, CacheError> {
    let Some(descriptor) = self.index_entry(&mutation.bindings) else {
      debug!(region = %self.region_name(), bindings = %mutation.bindings, "no cached result indexed, skipping mutation");
      Metrics::bump(&self.metrics.mutations_without_index);
      return Ok(false);
    };
    let row = descriptor.shape().disassemble(&mutation.row)?;

    let (composite, interrupt) = match lock {
      MutationLock::Unlocked => (None, None),
      MutationLock::Blocking(index) => (Some(index.lock_for(mutation.bindings.iter())), None),
      MutationLock::Interruptible(index, interrupt) => {
        (Some(index.lock_for(mutation.bindings.iter())), Some(interrupt))
      }
    };
    let _guard = match (&composite, interrupt) {
      (Some(composite), Some(interrupt)) => Some(composite.lock_interruptibly(interrupt)?),
      (Some(composite), None) => Some(composite.lock()),
      (None, _) => None,
    };

    let key = StoreKey::Query(descriptor.key().clone());
    let Some(mut list) = self.results(&key) else {
      debug!(region = %self.region_name(), bindings = %mutation.bindings, "indexed result list was evicted, skipping mutation");
      Metrics::bump(&self.metrics.mutations_without_list);
      return Ok(false);
    };

    match mutation.kind {
      MutationKind::Add => {
        list.push(row);
        Metrics::bump(&self.metrics.rows_added);
      }
      MutationKind::Remove => {
        if list.remove_first(&row) {
          Metrics::bump(&self.metrics.rows_removed);
        }
      }
      MutationKind::ReplaceUnique { add } => {
        list.replace_unique(add.then_some(row));
      }
    }

    debug!(
      region = %self.region_name(),
      bindings = %mutation.bindings,
      kind = ?mutation.kind,
      rows = list.len(),
      "applied mutation to cached result"
    );
    self.store.put(key, StoreValue::Results(list));
    Metrics::bump(&self.metrics.mutations_applied);
    if composite.is_some() {
      Metrics::bump(&self.metrics.locked_mutations);
    }
    Ok(true)
  }

  /// Drops every cached result and index entry of this region.
  pub fn clear(&self) {
    self.store.clear();
  }

  fn results(&self, key: &StoreKey) -> Option<CachedResultList> {
    match self.store.get(key)? {
      StoreValue::Results(list) => Some(list),
      StoreValue::Index(_) => None,
    }
  }
}
