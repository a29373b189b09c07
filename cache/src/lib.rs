//! Parameter-indexed query result caching that stays consistent with the
//! data it was computed from.
//!
//! A [`QueryCache`] stores query results under their [`QueryKey`] and keeps a
//! secondary index from the query's [`ParameterBindings`] to that result.
//! When an entity changes, a registered [`CacheCallback`] describes which
//! bindings the entity belongs to and which row it contributes, and the
//! [`QueryCacheListener`] patches the cached list in place instead of
//! discarding the region.
//!
//! # Features
//! - **Fine-grained writers**: concurrent mutations of the same bindings are
//!   serialized by a composite lock over the bound values (see [`latchkey`]),
//!   while mutations of unrelated bindings run in parallel. Readers never lock.
//! - **Drift tolerance**: results and index entries may be evicted
//!   independently. Lookups re-create a missing index entry; mutations that
//!   find nothing indexed, or an index entry without its result, are skipped.
//! - **Pluggable storage**: regions sit on a [`RegionStore`]; the bundled
//!   [`MemoryRegion`] is sharded and optionally bounded.
//! - **Observability**: each region exposes a [`MetricsSnapshot`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use latchkey_cache::{
//!   CallbackError, ColumnType, Command, ParameterBindings, QueryCacheListener, QueryCacheRegions,
//!   QueryKey, Registrations, ResultRow, ResultShape, Value,
//! };
//!
//! struct Person { id: i64, phone: String }
//!
//! let registrations = Arc::new(Registrations::new());
//! registrations.register::<Person, _>(
//!   "people_by_phone",
//!   |command: &mut Command, person: &Person| -> Result<(), CallbackError> {
//!     command.set_parameter("phone", person.phone.as_str()).add_result(person.id);
//!     Ok(())
//!   },
//!   true,
//! );
//! let regions = Arc::new(QueryCacheRegions::new());
//! let listener = QueryCacheListener::new(registrations, regions.clone());
//!
//! let cache = regions.query_cache("people_by_phone");
//! let bindings = ParameterBindings::new().with("phone", "555");
//! let key = QueryKey::new("select id from person where phone = :phone", bindings);
//! let shape = ResultShape::scalar(ColumnType::Long);
//! cache.put(key.clone(), shape.clone(), &[ResultRow::from(1i64)]).unwrap();
//!
//! listener.on_insert(&Person { id: 2, phone: "555".into() }).unwrap();
//!
//! let ids: Vec<_> = cache.get(&key, &shape).unwrap().scalars().cloned().collect();
//! assert_eq!(ids, vec![Value::Int(1), Value::Int(2)]);
//! ```

pub mod bindings;
pub mod callback;
pub mod command;
pub mod error;
pub mod key;
pub mod listener;
pub mod metrics;
pub mod query_cache;
pub mod regions;
pub mod registry;
pub mod row;
pub mod store;
pub mod value;

pub use bindings::ParameterBindings;
pub use callback::CacheCallback;
pub use command::{ChangeKind, Command};
pub use error::{BuildError, CacheError, CallbackError};
pub use key::{CacheEntryDescriptor, QueryKey};
pub use listener::QueryCacheListener;
pub use metrics::MetricsSnapshot;
pub use query_cache::{Mutation, MutationKind, MutationLock, QueryCache};
pub use regions::{QueryCacheRegions, StoreFactory};
pub use registry::{Registration, Registrations};
pub use row::{CachedResultList, CachedRow, ColumnType, ResultRow, ResultShape};
pub use store::{MemoryRegion, MemoryRegionBuilder, RegionStore, StoreKey, StoreValue};
pub use value::Value;

pub use latchkey;
