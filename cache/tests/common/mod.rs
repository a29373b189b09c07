#![allow(dead_code)]

use std::collections::BTreeMap;

use latchkey_cache::{
  CacheError, CachedResultList, ParameterBindings, QueryCache, QueryCacheListener, QueryKey, ResultRow,
  ResultShape, Value,
};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

pub const IDS_BY_PHONE: &str = "select p.id from Person p where p.phone = :phone";
pub const ID_AND_PHONE_BY_ADDRESS: &str = "select p.id, p.phone from Person p where p.address = :address";

/// Installs a fmt subscriber for the test binary. Honors `RUST_LOG`.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_test_writer()
    .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
  pub id: i64,
  pub phone: String,
  pub address: String,
  pub active: bool,
}

impl Person {
  pub fn new(id: i64, phone: &str, address: &str) -> Self {
    Self {
      id,
      phone: phone.to_owned(),
      address: address.to_owned(),
      active: true,
    }
  }
}

/// An in-memory table of people that reports every write to the listener
/// once the write is visible, like a post-commit hook.
pub struct Database {
  rows: Mutex<BTreeMap<i64, Person>>,
  listener: QueryCacheListener,
}

impl Database {
  pub fn new(listener: QueryCacheListener) -> Self {
    Self {
      rows: Mutex::new(BTreeMap::new()),
      listener,
    }
  }

  pub fn listener(&self) -> &QueryCacheListener {
    &self.listener
  }

  pub fn insert(&self, person: Person) -> Result<(), CacheError> {
    self.rows.lock().insert(person.id, person.clone());
    self.listener.on_insert(&person)
  }

  pub fn update(&self, person: Person) -> Result<(), CacheError> {
    self.rows.lock().insert(person.id, person.clone());
    self.listener.on_update(&person)
  }

  pub fn delete(&self, id: i64) -> Result<Option<Person>, CacheError> {
    let removed = self.rows.lock().remove(&id);
    if let Some(person) = &removed {
      self.listener.on_delete(person)?;
    }
    Ok(removed)
  }

  pub fn select(&self, filter: impl Fn(&Person) -> bool) -> Vec<Person> {
    self.rows.lock().values().filter(|p| filter(p)).cloned().collect()
  }
}

/// Reads through `cache`, computing and caching the result on a miss.
pub fn cached_query(
  cache: &QueryCache,
  key: &QueryKey,
  shape: &ResultShape,
  compute: impl FnOnce() -> Vec<ResultRow>,
) -> CachedResultList {
  if let Some(list) = cache.get(key, shape) {
    return list;
  }
  let rows = compute();
  cache
    .put(key.clone(), shape.clone(), &rows)
    .expect("computed rows match their shape");
  // A bounded region may already have evicted the fresh list again.
  cache.get(key, shape).unwrap_or_else(|| {
    let rows = rows
      .iter()
      .map(|row| shape.disassemble(row))
      .collect::<Result<Vec<_>, _>>()
      .expect("computed rows match their shape");
    CachedResultList::new(rows)
  })
}

pub fn phone_key(phone: &str) -> QueryKey {
  QueryKey::new(IDS_BY_PHONE, ParameterBindings::new().with("phone", phone))
}

pub fn address_key(address: &str) -> QueryKey {
  QueryKey::new(ID_AND_PHONE_BY_ADDRESS, ParameterBindings::new().with("address", address))
}

/// Ids of people with `phone`, read through the cache.
pub fn ids_by_phone(db: &Database, cache: &QueryCache, shape: &ResultShape, phone: &str) -> Vec<i64> {
  let list = cached_query(cache, &phone_key(phone), shape, || {
    db.select(|p| p.phone == phone)
      .into_iter()
      .map(|p| ResultRow::from(p.id))
      .collect()
  });
  ints(&list)
}

pub fn ints(list: &CachedResultList) -> Vec<i64> {
  list.scalars().filter_map(Value::as_int).collect()
}
