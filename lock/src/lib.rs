//! Fine-grained, per-value locking for concurrent Rust code.
//!
//! Latchkey hands out one reentrant lock per distinct value and lets a caller
//! take a dynamically sized set of them as a single unit.
//!
//! # Features
//! - **All-or-nothing acquisition**: a [`CompositeLock`] either holds every
//!   member or none of them. A partial acquisition is always rolled back
//!   before a retry, so overlapping composites cannot deadlock regardless of
//!   the order their members were listed in.
//! - **Self-reclaiming registries**: a [`WeakLockMap`] keeps only weak
//!   references to the locks it mints. Once the last handle for a value is
//!   dropped, both the value and its lock leave the map.
//! - **Parameter scoping**: a [`ParameterLockIndex`] keeps one registry per
//!   parameter name and builds a composite over a set of `(name, value)` pairs.
//! - **Cancellation**: blocking acquisition can be aborted through an
//!   [`Interrupt`] without leaving any member held.
//!
//! # Example
//!
//! ```
//! use latchkey::ParameterLockIndex;
//!
//! let index: ParameterLockIndex<i64> = ParameterLockIndex::new();
//! let composite = index.lock_for([("account", &7), ("branch", &2)]);
//!
//! let guard = composite.lock();
//! assert!(composite.is_held_by_current_thread());
//! drop(guard);
//! assert!(!composite.is_held_by_current_thread());
//! ```

pub mod composite;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod param_index;
pub mod weak_map;

pub use composite::{CompositeGuard, CompositeLock, DEFAULT_WAIT_TIMEOUT};
pub use config::LockConfig;
pub use error::LockError;
pub use interrupt::Interrupt;
pub use param_index::ParameterLockIndex;
pub use weak_map::{LockHandle, WeakLockMap};
