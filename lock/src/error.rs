use thiserror::Error;

/// Errors surfaced by the locking primitives.
///
/// Contention is never an error: the non-blocking variants report it as a
/// `None` guard and the blocking variants keep retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockError {
  /// The blocking acquisition was cancelled through an [`Interrupt`](crate::Interrupt).
  /// No member lock is held when this is returned.
  #[error("lock acquisition was interrupted")]
  Interrupted,

  /// Composite locks span several mutexes and cannot offer wait/notify.
  #[error("composite locks do not support conditions")]
  ConditionUnsupported,
}
