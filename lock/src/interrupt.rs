use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation signal for blocking lock acquisition.
///
/// Cloning an `Interrupt` yields another handle to the same flag, so one
/// thread can park in [`CompositeLock::lock_interruptibly`](crate::CompositeLock::lock_interruptibly)
/// while another cancels it.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
  flag: Arc<AtomicBool>,
}

impl Interrupt {
  pub fn new() -> Self {
    Self::default()
  }

  /// Raises the signal. Every waiter observing this flag gives up at its next retry.
  pub fn interrupt(&self) {
    self.flag.store(true, Ordering::Release);
  }

  pub fn is_interrupted(&self) -> bool {
    self.flag.load(Ordering::Acquire)
  }

  /// Lowers the signal so the token can be reused.
  pub fn clear(&self) {
    self.flag.store(false, Ordering::Release);
  }
}
