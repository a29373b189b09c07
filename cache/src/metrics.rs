use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// Lock-free counters for one query cache region.
#[derive(Debug)]
pub(crate) struct Metrics {
  // --- Lookups ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,
  pub(crate) puts: CachePadded<AtomicU64>,

  // --- Drift ---
  pub(crate) index_repairs: CachePadded<AtomicU64>,
  pub(crate) mutations_without_index: CachePadded<AtomicU64>,
  pub(crate) mutations_without_list: CachePadded<AtomicU64>,

  // --- Mutations ---
  pub(crate) mutations_applied: CachePadded<AtomicU64>,
  pub(crate) locked_mutations: CachePadded<AtomicU64>,
  pub(crate) rows_added: CachePadded<AtomicU64>,
  pub(crate) rows_removed: CachePadded<AtomicU64>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      puts: CachePadded::new(AtomicU64::new(0)),
      index_repairs: CachePadded::new(AtomicU64::new(0)),
      mutations_without_index: CachePadded::new(AtomicU64::new(0)),
      mutations_without_list: CachePadded::new(AtomicU64::new(0)),
      mutations_applied: CachePadded::new(AtomicU64::new(0)),
      locked_mutations: CachePadded::new(AtomicU64::new(0)),
      rows_added: CachePadded::new(AtomicU64::new(0)),
      rows_removed: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      puts: self.puts.load(Ordering::Relaxed),
      index_repairs: self.index_repairs.load(Ordering::Relaxed),
      mutations_without_index: self.mutations_without_index.load(Ordering::Relaxed),
      mutations_without_list: self.mutations_without_list.load(Ordering::Relaxed),
      mutations_applied: self.mutations_applied.load(Ordering::Relaxed),
      locked_mutations: self.locked_mutations.load(Ordering::Relaxed),
      rows_added: self.rows_added.load(Ordering::Relaxed),
      rows_removed: self.rows_removed.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time snapshot of a query cache's counters.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// Lookups answered from the cache.
  pub hits: u64,
  /// Lookups that found no cached result.
  pub misses: u64,
  /// The cache hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// Result lists stored by readers.
  pub puts: u64,
  /// Secondary index entries re-created on lookup after drifting away.
  pub index_repairs: u64,
  /// Mutations ignored because nothing was indexed for their bindings.
  pub mutations_without_index: u64,
  /// Mutations ignored because the indexed result list had been evicted.
  pub mutations_without_list: u64,
  /// Mutations written back to a cached result list.
  pub mutations_applied: u64,
  /// Applied mutations that ran under a composite lock.
  pub locked_mutations: u64,
  pub rows_added: u64,
  pub rows_removed: u64,
  /// The number of seconds the cache has been running.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("puts", &self.puts)
      .field("index_repairs", &self.index_repairs)
      .field("mutations_without_index", &self.mutations_without_index)
      .field("mutations_without_list", &self.mutations_without_list)
      .field("mutations_applied", &self.mutations_applied)
      .field("locked_mutations", &self.locked_mutations)
      .field("rows_added", &self.rows_added)
      .field("rows_removed", &self.rows_removed)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
