mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::*;
use latchkey_cache::{
  CallbackError, ColumnType, Command, QueryCacheListener, QueryCacheRegions, Registrations, ResultShape,
};
use pretty_assertions::assert_eq;

const BY_PHONE: &str = "person_by_phone";
const THREADS: usize = 8;
const PER_THREAD: i64 = 50;

fn setup() -> (Arc<QueryCacheRegions>, Arc<Database>) {
  init_tracing();
  let registrations = Arc::new(Registrations::new());
  registrations.register::<Person, _>(
    BY_PHONE,
    |command: &mut Command, person: &Person| -> Result<(), CallbackError> {
      command.set_parameter("phone", person.phone.as_str()).add_result(person.id);
      Ok(())
    },
    true,
  );
  let regions = Arc::new(QueryCacheRegions::new());
  let db = Arc::new(Database::new(QueryCacheListener::new(registrations, regions.clone())));
  (regions, db)
}

#[test]
fn test_concurrent_inserts_on_shared_bindings_are_not_lost() {
  let (regions, db) = setup();
  let cache = regions.query_cache(BY_PHONE);
  let shape = ResultShape::scalar(ColumnType::Long);
  assert!(ids_by_phone(&db, &cache, &shape, "123").is_empty());

  let barrier = Arc::new(Barrier::new(THREADS));
  let handles: Vec<_> = (0..THREADS as i64)
    .map(|t| {
      let db = db.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        for n in 0..PER_THREAD {
          db.insert(Person::new(t * PER_THREAD + n, "123", "Main St")).unwrap();
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }

  let mut ids = ids_by_phone(&db, &cache, &shape, "123");
  ids.sort_unstable();
  let expected: Vec<i64> = (0..THREADS as i64 * PER_THREAD).collect();
  assert_eq!(ids, expected);
  assert_eq!(cache.metrics().locked_mutations, THREADS as u64 * PER_THREAD as u64);
}

#[test]
fn test_disjoint_bindings_are_updated_independently() {
  let (regions, db) = setup();
  let cache = regions.query_cache(BY_PHONE);
  let shape = ResultShape::scalar(ColumnType::Long);
  for t in 0..THREADS {
    assert!(ids_by_phone(&db, &cache, &shape, &format!("phone-{t}")).is_empty());
  }

  let barrier = Arc::new(Barrier::new(THREADS));
  let handles: Vec<_> = (0..THREADS)
    .map(|t| {
      let db = db.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        let phone = format!("phone-{t}");
        for n in 0..PER_THREAD {
          let id = t as i64 * PER_THREAD + n;
          db.insert(Person::new(id, &phone, "Main St")).unwrap();
          if n % 2 == 1 {
            db.delete(id).unwrap();
          }
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }

  for t in 0..THREADS {
    let base = t as i64 * PER_THREAD;
    let expected: Vec<i64> = (0..PER_THREAD).step_by(2).map(|n| base + n).collect();
    assert_eq!(ids_by_phone(&db, &cache, &shape, &format!("phone-{t}")), expected);
  }
}

#[test]
fn test_readers_run_alongside_writers() {
  let (regions, db) = setup();
  let cache = regions.query_cache(BY_PHONE);
  let shape = ResultShape::scalar(ColumnType::Long);
  assert!(ids_by_phone(&db, &cache, &shape, "123").is_empty());

  let barrier = Arc::new(Barrier::new(2));
  let writer = {
    let db = db.clone();
    let barrier = barrier.clone();
    thread::spawn(move || {
      barrier.wait();
      for id in 0..200 {
        db.insert(Person::new(id, "123", "Main St")).unwrap();
      }
    })
  };
  let reader = {
    let db = db.clone();
    let cache = cache.clone();
    let shape = shape.clone();
    thread::spawn(move || {
      barrier.wait();
      let mut last = 0;
      for _ in 0..200 {
        let seen = ids_by_phone(&db, &cache, &shape, "123").len();
        assert!(seen >= last, "the cached list only grows");
        last = seen;
      }
    })
  };
  writer.join().unwrap();
  reader.join().unwrap();

  assert_eq!(ids_by_phone(&db, &cache, &shape, "123").len(), 200);
}
