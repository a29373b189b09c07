use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use latchkey::LockHandle;

/// Holds `handle` on a helper thread until the returned release sender fires
/// (or is dropped). Returns once the helper owns the lock.
pub fn hold_on_other_thread(handle: LockHandle<usize>) -> (mpsc::Sender<()>, JoinHandle<()>) {
  let (acquired_tx, acquired_rx) = mpsc::channel();
  let (release_tx, release_rx) = mpsc::channel::<()>();
  let join = thread::spawn(move || {
    let _guard = handle.lock();
    acquired_tx.send(()).unwrap();
    let _ = release_rx.recv();
  });
  acquired_rx.recv().unwrap();
  (release_tx, join)
}
