use core::fmt;
use std::hash::Hash;

use dashmap::DashMap;

use crate::composite::CompositeLock;
use crate::config::LockConfig;
use crate::weak_map::WeakLockMap;

/// Builds composite locks over named parameter values.
///
/// Each parameter name gets its own [`WeakLockMap`], created on first use, so
/// the same value bound to two different names maps to two unrelated locks.
/// Two composites built from bindings that share at least one `(name, value)`
/// pair exclude each other; composites over disjoint bindings never contend.
pub struct ParameterLockIndex<V: Eq + Hash> {
  registries: DashMap<String, WeakLockMap<V>, ahash::RandomState>,
  config: LockConfig,
}

impl<V: Eq + Hash> fmt::Debug for ParameterLockIndex<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ParameterLockIndex")
      .field("parameters", &self.registries.len())
      .field("config", &self.config)
      .finish()
  }
}

impl<V: Eq + Hash + Clone> Default for ParameterLockIndex<V> {
  fn default() -> Self {
    Self::with_config(LockConfig::default())
  }
}

impl<V: Eq + Hash + Clone> ParameterLockIndex<V> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_config(config: LockConfig) -> Self {
    Self {
      registries: DashMap::with_hasher(ahash::RandomState::new()),
      config,
    }
  }

  pub fn config(&self) -> &LockConfig {
    &self.config
  }

  /// Returns a new composite over the locks of every `(name, value)` pair,
  /// in the iteration order of `bindings`.
  ///
  /// The composite is not acquired; the caller owns the critical section.
  pub fn lock_for<'a, I>(&self, bindings: I) -> CompositeLock<V>
  where
    I: IntoIterator<Item = (&'a str, &'a V)>,
    V: 'a,
  {
    let locks = bindings
      .into_iter()
      .map(|(name, value)| self.registry(name).get_lock(value))
      .collect();
    CompositeLock::with_wait_timeout(self.config.wait_timeout, locks)
  }

  /// Number of parameter names seen so far.
  pub fn parameter_count(&self) -> usize {
    self.registries.len()
  }

  /// Number of live locks registered for `name`.
  pub fn live_locks(&self, name: &str) -> usize {
    self.registries.get(name).map_or(0, |registry| registry.len())
  }

  fn registry(&self, name: &str) -> WeakLockMap<V> {
    if let Some(registry) = self.registries.get(name) {
      return registry.clone();
    }
    self
      .registries
      .entry(name.to_owned())
      .or_insert_with(|| WeakLockMap::with_config(&self.config))
      .clone()
  }
}
