use core::fmt;
use std::hash::Hash;
use std::time::Duration;

use crossbeam_utils::Backoff;
use parking_lot::{Condvar, ReentrantMutexGuard};
use tracing::trace;

use crate::error::LockError;
use crate::interrupt::Interrupt;
use crate::weak_map::LockHandle;

/// Per-member wait used by the blocking acquisition paths.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(100);

/// A set of exclusive locks acquired and released as one unit.
///
/// Acquisition walks the members in the order they were given. If any member
/// cannot be taken, every member acquired so far is released in reverse order
/// and the attempt reports failure holding nothing. Because a partial set is
/// never kept while waiting on the rest, two composites with overlapping
/// members cannot deadlock on each other whatever order they list them in;
/// under contention they may instead both retry for a while.
///
/// A `CompositeLock` is cheap and call-scoped. Build one per critical section.
pub struct CompositeLock<K: Eq + Hash> {
  locks: Vec<LockHandle<K>>,
  wait_timeout: Duration,
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for CompositeLock<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompositeLock")
      .field("locks", &self.locks)
      .field("wait_timeout", &self.wait_timeout)
      .finish()
  }
}

impl<K: Eq + Hash> CompositeLock<K> {
  /// Creates a composite over `locks` with the default wait timeout.
  pub fn new(locks: Vec<LockHandle<K>>) -> Self {
    Self::with_wait_timeout(DEFAULT_WAIT_TIMEOUT, locks)
  }

  pub fn with_wait_timeout(wait_timeout: Duration, locks: Vec<LockHandle<K>>) -> Self {
    Self {
      locks,
      wait_timeout,
    }
  }

  pub fn len(&self) -> usize {
    self.locks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.locks.is_empty()
  }

  pub fn wait_timeout(&self) -> Duration {
    self.wait_timeout
  }

  pub fn members(&self) -> &[LockHandle<K>] {
    &self.locks
  }

  /// Tries to take every member without blocking.
  pub fn try_lock(&self) -> Option<CompositeGuard<'_>> {
    self.acquire_each(|lock| lock.try_lock())
  }

  /// Tries to take every member, letting each one block for up to `timeout`.
  pub fn try_lock_for(&self, timeout: Duration) -> Option<CompositeGuard<'_>> {
    self.acquire_each(|lock| lock.try_lock_for(timeout))
  }

  /// Blocks until every member is held.
  ///
  /// If the calling thread already holds all members this simply re-enters
  /// them. Otherwise it retries [`try_lock_for`](Self::try_lock_for) with the
  /// configured wait timeout, yielding between attempts, until it succeeds.
  pub fn lock(&self) -> CompositeGuard<'_> {
    if let Some(guard) = self.reenter() {
      return guard;
    }

    let backoff = Backoff::new();
    loop {
      if let Some(guard) = self.try_lock_for(self.wait_timeout) {
        return guard;
      }
      trace!(members = self.locks.len(), "composite lock contended, retrying");
      backoff.snooze();
    }
  }

  /// Like [`lock`](Self::lock), but gives up once `interrupt` is raised.
  ///
  /// The signal is checked before every attempt, so cancellation is observed
  /// within roughly one wait timeout per member.
  pub fn lock_interruptibly(&self, interrupt: &Interrupt) -> Result<CompositeGuard<'_>, LockError> {
    if let Some(guard) = self.reenter() {
      return Ok(guard);
    }

    let backoff = Backoff::new();
    loop {
      if interrupt.is_interrupted() {
        trace!(members = self.locks.len(), "composite lock acquisition interrupted");
        return Err(LockError::Interrupted);
      }
      if let Some(guard) = self.try_lock_for(self.wait_timeout) {
        return Ok(guard);
      }
      trace!(members = self.locks.len(), "composite lock contended, retrying");
      backoff.snooze();
    }
  }

  /// Composite locks cannot hand out a condition variable.
  pub fn new_condition(&self) -> Result<Condvar, LockError> {
    Err(LockError::ConditionUnsupported)
  }

  /// Whether the calling thread holds every member.
  pub fn is_held_by_current_thread(&self) -> bool {
    self.locks.iter().all(LockHandle::is_held_by_current_thread)
  }

  fn reenter(&self) -> Option<CompositeGuard<'_>> {
    if self.is_held_by_current_thread() {
      self.try_lock()
    } else {
      None
    }
  }

  fn acquire_each<'a, F>(&'a self, mut acquire: F) -> Option<CompositeGuard<'a>>
  where
    F: FnMut(&'a LockHandle<K>) -> Option<ReentrantMutexGuard<'a, ()>>,
  {
    let mut guards = Vec::with_capacity(self.locks.len());
    for lock in &self.locks {
      match acquire(lock) {
        Some(guard) => guards.push(guard),
        None => {
          // Roll back newest first.
          while let Some(guard) = guards.pop() {
            drop(guard);
          }
          return None;
        }
      }
    }
    Some(CompositeGuard { guards })
  }
}

/// Proof that every member of a [`CompositeLock`] is held.
///
/// Dropping the guard releases the members in acquisition order. The guard
/// is tied to the acquiring thread.
#[must_use = "if unused the composite lock will immediately unlock"]
pub struct CompositeGuard<'a> {
  guards: Vec<ReentrantMutexGuard<'a, ()>>,
}

impl<'a> CompositeGuard<'a> {
  /// Number of member locks held by this guard.
  pub fn len(&self) -> usize {
    self.guards.len()
  }

  pub fn is_empty(&self) -> bool {
    self.guards.is_empty()
  }

  /// Releases every member. Equivalent to dropping the guard.
  pub fn unlock(self) {
    drop(self);
  }
}

impl<'a> fmt::Debug for CompositeGuard<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompositeGuard")
      .field("held", &self.guards.len())
      .finish()
  }
}
