use core::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::config::LockConfig;

type SlotMap<K> = DashMap<K, Weak<LockSlot<K>>, ahash::RandomState>;

/// The shared state behind every [`LockHandle`] minted for one key.
///
/// A slot knows its own key and the map it lives in, so it can remove its
/// entry when the last handle goes away.
struct LockSlot<K: Eq + Hash> {
  key: K,
  mutex: ReentrantMutex<()>,
  owner: Weak<SlotMap<K>>,
}

impl<K: Eq + Hash> Drop for LockSlot<K> {
  fn drop(&mut self) {
    let Some(map) = self.owner.upgrade() else {
      return;
    };
    // A racing `get_lock` may already have replaced our dead entry with a
    // live slot. Only a dead entry is ours to remove.
    map.remove_if(&self.key, |_, weak| weak.strong_count() == 0);
  }
}

/// A shared reference to the exclusive lock of one key.
///
/// The lock is reentrant and owned by the thread that acquired it. It stays
/// registered for as long as at least one handle for it is alive.
pub struct LockHandle<K: Eq + Hash> {
  slot: Arc<LockSlot<K>>,
}

impl<K: Eq + Hash> Clone for LockHandle<K> {
  fn clone(&self) -> Self {
    Self {
      slot: Arc::clone(&self.slot),
    }
  }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for LockHandle<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LockHandle")
      .field("key", &self.slot.key)
      .field("locked", &self.slot.mutex.is_locked())
      .finish()
  }
}

impl<K: Eq + Hash> LockHandle<K> {
  /// The key this lock was minted for.
  pub fn key(&self) -> &K {
    &self.slot.key
  }

  /// Blocks until the lock is acquired.
  pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
    self.slot.mutex.lock()
  }

  pub fn try_lock(&self) -> Option<ReentrantMutexGuard<'_, ()>> {
    self.slot.mutex.try_lock()
  }

  pub fn try_lock_for(&self, timeout: Duration) -> Option<ReentrantMutexGuard<'_, ()>> {
    self.slot.mutex.try_lock_for(timeout)
  }

  /// Whether any thread currently holds this lock.
  pub fn is_locked(&self) -> bool {
    self.slot.mutex.is_locked()
  }

  pub fn is_held_by_current_thread(&self) -> bool {
    self.slot.mutex.is_owned_by_current_thread()
  }

  /// Returns `true` if both handles refer to the same underlying lock.
  pub fn ptr_eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.slot, &other.slot)
  }
}

/// A concurrent map from keys to locks that never keeps a lock alive by itself.
///
/// [`get_lock`](Self::get_lock) returns the live lock for a key if there is
/// one and mints it otherwise. At most one live lock exists per key: racing
/// callers for the same key all observe the single winner. Calls for
/// different keys only meet on the map's shard locks and never on each
/// other's key locks.
///
/// The map stores weak references. When the last [`LockHandle`] for a key is
/// dropped the entry, key included, is removed, so a map fed an unbounded
/// stream of distinct keys only grows with the number of keys in use.
pub struct WeakLockMap<K: Eq + Hash> {
  slots: Arc<SlotMap<K>>,
}

impl<K: Eq + Hash> Clone for WeakLockMap<K> {
  fn clone(&self) -> Self {
    Self {
      slots: Arc::clone(&self.slots),
    }
  }
}

impl<K: Eq + Hash> fmt::Debug for WeakLockMap<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WeakLockMap")
      .field("entries", &self.slots.len())
      .finish()
  }
}

impl<K: Eq + Hash + Clone> Default for WeakLockMap<K> {
  fn default() -> Self {
    Self::with_config(&LockConfig::default())
  }
}

impl<K: Eq + Hash + Clone> WeakLockMap<K> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a map sized by the registry settings of `config`.
  pub fn with_config(config: &LockConfig) -> Self {
    let slots = DashMap::with_capacity_and_hasher_and_shard_amount(
      config.registry_capacity,
      ahash::RandomState::new(),
      config.shard_amount(),
    );
    Self {
      slots: Arc::new(slots),
    }
  }

  /// Returns the lock for `key`, minting it on first use.
  pub fn get_lock(&self, key: &K) -> LockHandle<K> {
    if let Some(slot) = self.slots.get(key).and_then(|weak| weak.upgrade()) {
      return LockHandle { slot };
    }

    match self.slots.entry(key.clone()) {
      Entry::Occupied(mut occupied) => {
        if let Some(slot) = occupied.get().upgrade() {
          return LockHandle { slot };
        }
        // The previous lock for this key is mid-drop; its own cleanup will
        // see our live slot and leave it alone.
        let slot = self.mint(key);
        occupied.insert(Arc::downgrade(&slot));
        LockHandle { slot }
      }
      Entry::Vacant(vacant) => {
        let slot = self.mint(key);
        vacant.insert(Arc::downgrade(&slot));
        LockHandle { slot }
      }
    }
  }

  fn mint(&self, key: &K) -> Arc<LockSlot<K>> {
    Arc::new(LockSlot {
      key: key.clone(),
      mutex: ReentrantMutex::new(()),
      owner: Arc::downgrade(&self.slots),
    })
  }
}

impl<K: Eq + Hash> WeakLockMap<K> {
  /// Number of keys that currently have a live lock.
  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }
}
