/// Errors raised by the join engine itself, as opposed to errors coming from
/// the joined sources or selectors.
///
/// They only surface for a `when` whose error type can be built from them,
/// see [`When::queue_capacity`](crate::join::When::queue_capacity).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
  /// A source produced more unmatched values than its queue may hold.
  ///
  /// `slot` is the position of the source in registration order: the order
  /// in which the plans of the `when` first mention it.
  #[error("join queue of source #{slot} overflowed (capacity: {capacity})")]
  QueueOverflow {
    /// Position of the overflowing source
    slot: usize,
    /// The configured bound
    capacity: usize,
  },
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn overflow_message() {
    let err = JoinError::QueueOverflow { slot: 1, capacity: 8 };
    assert_eq!(err.to_string(), "join queue of source #1 overflowed (capacity: 8)");
  }
}
