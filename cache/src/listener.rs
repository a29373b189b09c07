use core::fmt;
use std::sync::Arc;

use latchkey::Interrupt;
use tracing::{debug, trace};

use crate::command::{ChangeKind, Command};
use crate::error::{CacheError, CallbackError};
use crate::query_cache::MutationLock;
use crate::regions::QueryCacheRegions;
use crate::registry::{Registration, Registrations};

/// Feeds entity changes into the query caches registered for them.
///
/// Call one of the `on_*` methods after the change has been written to the
/// data source. Each registration for the entity's type runs its callback
/// and applies the resulting mutations to its region.
pub struct QueryCacheListener {
  registrations: Arc<Registrations>,
  regions: Arc<QueryCacheRegions>,
  interrupt: Option<Interrupt>,
}

impl fmt::Debug for QueryCacheListener {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryCacheListener")
      .field("registrations", &self.registrations)
      .field("regions", &self.regions)
      .field("interruptible", &self.interrupt.is_some())
      .finish()
  }
}

impl QueryCacheListener {
  pub fn new(registrations: Arc<Registrations>, regions: Arc<QueryCacheRegions>) -> Self {
    Self {
      registrations,
      regions,
      interrupt: None,
    }
  }

  /// Makes every locked mutation give up with [`CacheError::Lock`] once
  /// `interrupt` is raised.
  pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  pub fn registrations(&self) -> &Arc<Registrations> {
    &self.registrations
  }

  pub fn regions(&self) -> &Arc<QueryCacheRegions> {
    &self.regions
  }

  pub fn on_insert<T: 'static>(&self, entity: &T) -> Result<(), CacheError> {
    self.notify(ChangeKind::Insert, entity)
  }

  pub fn on_delete<T: 'static>(&self, entity: &T) -> Result<(), CacheError> {
    self.notify(ChangeKind::Delete, entity)
  }

  pub fn on_update<T: 'static>(&self, entity: &T) -> Result<(), CacheError> {
    self.notify(ChangeKind::Update, entity)
  }

  /// Applies `change` of `entity` to every region registered for `T`.
  ///
  /// Stops at the first failing region; regions already updated keep
  /// their changes.
  pub fn notify<T: 'static>(&self, change: ChangeKind, entity: &T) -> Result<(), CacheError> {
    for registration in self.registrations.registrations_for::<T>() {
      self.apply(&registration, change, entity)?;
    }
    Ok(())
  }

  fn apply<T: 'static>(&self, registration: &Registration, change: ChangeKind, entity: &T) -> Result<(), CacheError> {
    let region = registration.region();
    let Some(callback) = registration.callback::<T>() else {
      return Ok(());
    };
    let Some(cache) = self.regions.get(region) else {
      trace!(region, ?change, "region has no cache yet, skipping");
      return Ok(());
    };

    let failed = |source: CallbackError| CacheError::Callback {
      region: region.to_owned(),
      source,
    };
    let mut command = Command::new();
    callback.common_params(&mut command, entity).map_err(failed)?;
    match change {
      ChangeKind::Insert | ChangeKind::Delete => callback.on_insert_or_delete(&mut command, entity),
      ChangeKind::Update => callback.on_update(&mut command, entity),
    }
    .map_err(failed)?;

    let lock = match (registration.is_concurrency_sensitive(), &self.interrupt) {
      (false, _) => MutationLock::Unlocked,
      (true, None) => MutationLock::Blocking(registration.lock_index()),
      (true, Some(interrupt)) => MutationLock::Interruptible(registration.lock_index(), interrupt),
    };

    let mutations = command.into_mutations(change);
    debug!(region, ?change, mutations = mutations.len(), "applying entity change to query cache");
    for mutation in &mutations {
      cache.apply_mutation(mutation, lock)?;
    }
    Ok(())
  }
}
