use latchkey::{LockConfig, ParameterLockIndex};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_composite_follows_binding_order() {
  let index: ParameterLockIndex<String> = ParameterLockIndex::new();
  let phone = "123".to_string();
  let city = "Tver".to_string();

  let composite = index.lock_for([("phone", &phone), ("city", &city)]);
  let keys: Vec<&String> = composite.members().iter().map(|lock| lock.key()).collect();
  assert_eq!(keys, vec![&phone, &city]);
  assert_eq!(index.parameter_count(), 2);
}

#[test]
fn test_same_value_under_different_names_is_a_different_lock() {
  let index: ParameterLockIndex<i64> = ParameterLockIndex::new();
  let a = index.lock_for([("owner", &1)]);
  let b = index.lock_for([("parent", &1)]);
  let c = index.lock_for([("owner", &1)]);

  assert!(!a.members()[0].ptr_eq(&b.members()[0]));
  assert!(a.members()[0].ptr_eq(&c.members()[0]));
}

#[test]
fn test_wait_timeout_comes_from_config() {
  let index: ParameterLockIndex<i64> =
    ParameterLockIndex::with_config(LockConfig::new().wait_timeout(Duration::from_millis(7)));
  assert_eq!(index.lock_for([("id", &1)]).wait_timeout(), Duration::from_millis(7));
}

#[test]
fn test_locks_are_reclaimed_after_the_critical_section() {
  let index: ParameterLockIndex<i64> = ParameterLockIndex::new();
  for value in 0..100 {
    let composite = index.lock_for([("id", &value), ("group", &(value % 3))]);
    let _guard = composite.lock();
  }
  assert_eq!(index.live_locks("id"), 0);
  assert_eq!(index.live_locks("group"), 0);
}

fn hold_in_thread(
  index: Arc<ParameterLockIndex<i64>>,
  bindings: Vec<(&'static str, i64)>,
) -> (mpsc::Sender<()>, thread::JoinHandle<()>) {
  let (ready_tx, ready_rx) = mpsc::channel();
  let (release_tx, release_rx) = mpsc::channel::<()>();
  let join = thread::spawn(move || {
    let composite = index.lock_for(bindings.iter().map(|(name, value)| (*name, value)));
    let _guard = composite.lock();
    ready_tx.send(()).unwrap();
    let _ = release_rx.recv();
  });
  ready_rx.recv().unwrap();
  (release_tx, join)
}

#[test]
fn test_overlapping_bindings_exclude_and_disjoint_bindings_do_not() {
  let index = Arc::new(ParameterLockIndex::new());
  let (release, join) = hold_in_thread(index.clone(), vec![("phone", 123), ("zone", 5)]);

  let disjoint = index.lock_for([("phone", &124), ("zone", &6)]);
  assert!(disjoint.try_lock().is_some());

  let overlapping = index.lock_for([("zone", &5), ("phone", &999)]);
  assert!(overlapping.try_lock().is_none());

  release.send(()).unwrap();
  join.join().unwrap();
  assert!(overlapping.try_lock().is_some());
}

#[test]
fn test_disjoint_bindings_run_in_parallel() {
  let index = Arc::new(ParameterLockIndex::<i64>::new());
  let threads = 4;
  let barrier = Arc::new(Barrier::new(threads));
  let inside = Arc::new(AtomicUsize::new(0));
  let peak = Arc::new(AtomicUsize::new(0));

  let started = Instant::now();
  let workers: Vec<_> = (0..threads as i64)
    .map(|value| {
      let index = index.clone();
      let barrier = barrier.clone();
      let inside = inside.clone();
      let peak = peak.clone();
      thread::spawn(move || {
        let composite = index.lock_for([("id", &value)]);
        barrier.wait();
        let _guard = composite.lock();
        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        inside.fetch_sub(1, Ordering::SeqCst);
      })
    })
    .collect();
  for worker in workers {
    worker.join().unwrap();
  }

  assert!(peak.load(Ordering::SeqCst) > 1, "disjoint sections never overlapped");
  assert!(started.elapsed() < Duration::from_millis(100 * threads as u64));
}

#[test]
fn test_shared_value_serializes_critical_sections() {
  let index = Arc::new(ParameterLockIndex::<i64>::new());
  let inside = Arc::new(AtomicUsize::new(0));
  let total = Arc::new(AtomicUsize::new(0));
  let threads = 4;
  let barrier = Arc::new(Barrier::new(threads));

  let workers: Vec<_> = (0..threads as i64)
    .map(|n| {
      let index = index.clone();
      let inside = inside.clone();
      let total = total.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        for _ in 0..50 {
          // Every composite shares ("account", 1) but otherwise differs.
          let composite = index.lock_for([("branch", &n), ("account", &1)]);
          let _guard = composite.lock();
          assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0, "shared value was not exclusive");
          total.fetch_add(1, Ordering::Relaxed);
          inside.fetch_sub(1, Ordering::SeqCst);
        }
      })
    })
    .collect();
  for worker in workers {
    worker.join().unwrap();
  }
  assert_eq!(total.load(Ordering::Relaxed), 200);
}
