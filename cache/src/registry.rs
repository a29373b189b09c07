use core::fmt;
use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use latchkey::{LockConfig, ParameterLockIndex};
use tracing::debug;

use crate::callback::CacheCallback;
use crate::value::Value;

type RegionTable = DashMap<String, Arc<Registration>, ahash::RandomState>;

/// One mapping callback bound to one region for one entity type.
pub struct Registration {
  region: String,
  concurrency_sensitive: bool,
  // Holds an `Arc<dyn CacheCallback<T>>` for the registered entity type.
  callback: Box<dyn Any + Send + Sync>,
  locks: ParameterLockIndex<Value>,
}

impl fmt::Debug for Registration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registration")
      .field("region", &self.region)
      .field("concurrency_sensitive", &self.concurrency_sensitive)
      .field("locks", &self.locks)
      .finish()
  }
}

impl Registration {
  pub fn region(&self) -> &str {
    &self.region
  }

  /// Whether mutations for this registration run under a composite lock.
  pub fn is_concurrency_sensitive(&self) -> bool {
    self.concurrency_sensitive
  }

  /// The callback, if this registration was made for entity type `T`.
  pub fn callback<T: 'static>(&self) -> Option<&Arc<dyn CacheCallback<T>>> {
    self.callback.downcast_ref()
  }

  /// The per-parameter locks guarding this registration's cached results.
  pub fn lock_index(&self) -> &ParameterLockIndex<Value> {
    &self.locks
  }
}

/// The table of mapping callbacks, keyed by entity type and region name.
#[derive(Default)]
pub struct Registrations {
  by_type: DashMap<TypeId, RegionTable, ahash::RandomState>,
  lock_config: LockConfig,
}

impl fmt::Debug for Registrations {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registrations")
      .field("entity_types", &self.by_type.len())
      .field("lock_config", &self.lock_config)
      .finish()
  }
}

impl Registrations {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every registration made afterwards builds its lock index from `config`.
  pub fn with_lock_config(config: LockConfig) -> Self {
    Self {
      by_type: DashMap::default(),
      lock_config: config,
    }
  }

  /// Registers `callback` to keep `region` up to date with changes to `T`.
  ///
  /// Returns `false` and keeps the existing registration if one was already
  /// made for this type and region.
  pub fn register<T, C>(&self, region: impl Into<String>, callback: C, concurrency_sensitive: bool) -> bool
  where
    T: 'static,
    C: CacheCallback<T> + 'static,
  {
    let region = region.into();
    let regions = self.by_type.entry(TypeId::of::<T>()).or_default();
    let registered = match regions.entry(region) {
      Entry::Occupied(existing) => {
        debug!(region = %existing.key(), "callback already registered for region, keeping the first");
        false
      }
      Entry::Vacant(slot) => {
        let callback: Arc<dyn CacheCallback<T>> = Arc::new(callback);
        let registration = Registration {
          region: slot.key().clone(),
          concurrency_sensitive,
          callback: Box::new(callback),
          locks: ParameterLockIndex::with_config(self.lock_config),
        };
        debug!(region = %registration.region, concurrency_sensitive, "registered query cache callback");
        slot.insert(Arc::new(registration));
        true
      }
    };
    registered
  }

  /// Every registration for entity type `T`, ordered by region name.
  pub fn registrations_for<T: 'static>(&self) -> Vec<Arc<Registration>> {
    let mut found: Vec<_> = self
      .by_type
      .get(&TypeId::of::<T>())
      .map(|regions| regions.iter().map(|entry| entry.value().clone()).collect())
      .unwrap_or_default();
    found.sort_by(|a, b| a.region.cmp(&b.region));
    found
  }

  pub fn get<T: 'static>(&self, region: &str) -> Option<Arc<Registration>> {
    self
      .by_type
      .get(&TypeId::of::<T>())?
      .get(region)
      .map(|entry| entry.value().clone())
  }
}
