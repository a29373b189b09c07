use std::time::Duration;

use crate::composite::DEFAULT_WAIT_TIMEOUT;

/// Tuning knobs shared by [`ParameterLockIndex`](crate::ParameterLockIndex)
/// and the composites it builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LockConfig {
  /// How long a single member acquisition may block before the composite
  /// rolls back and retries.
  pub wait_timeout: Duration,
  /// Initial capacity of each per-parameter registry.
  pub registry_capacity: usize,
  /// Shard count of each per-parameter registry.
  pub registry_shards: usize,
}

impl Default for LockConfig {
  fn default() -> Self {
    Self {
      wait_timeout: DEFAULT_WAIT_TIMEOUT,
      registry_capacity: 16,
      registry_shards: 128,
    }
  }
}

impl LockConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn wait_timeout(mut self, timeout: Duration) -> Self {
    self.wait_timeout = timeout;
    self
  }

  pub fn registry_capacity(mut self, capacity: usize) -> Self {
    self.registry_capacity = capacity;
    self
  }

  /// Sets the shard count of each registry.
  ///
  /// The underlying map requires at least two shards and a power of two, so
  /// the value is rounded up accordingly.
  pub fn registry_shards(mut self, shards: usize) -> Self {
    self.registry_shards = normalize_shards(shards);
    self
  }

  pub(crate) fn shard_amount(&self) -> usize {
    normalize_shards(self.registry_shards)
  }
}

fn normalize_shards(shards: usize) -> usize {
  shards.max(2).next_power_of_two()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn shards_are_rounded_to_a_power_of_two() {
    assert_eq!(LockConfig::new().registry_shards(0).registry_shards, 2);
    assert_eq!(LockConfig::new().registry_shards(3).registry_shards, 4);
    assert_eq!(LockConfig::new().registry_shards(64).registry_shards, 64);
  }

  #[test]
  fn default_wait_timeout_is_one_hundred_millis() {
    assert_eq!(LockConfig::default().wait_timeout, Duration::from_millis(100));
  }
}
