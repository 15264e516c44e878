/// Options of a `when`.
///
/// The default is what `when(plans)` uses: every join queue is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinConfig {
  /// Upper bound of queued, not yet matched values per source. A value
  /// arriving at a full queue terminates the `when` with
  /// [`JoinError::QueueOverflow`](crate::error::JoinError::QueueOverflow).
  pub queue_capacity: Option<usize>,
}

impl JoinConfig {
  #[inline]
  pub fn unbounded() -> Self { JoinConfig { queue_capacity: None } }

  #[inline]
  pub fn bounded(capacity: usize) -> Self { JoinConfig { queue_capacity: Some(capacity) } }
}
