//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion).

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
///
/// An Observer receives values, errors, and completion notifications from
/// an Observable. After `error` or `complete` has been delivered, no further
/// notification reaches the observer.
///
/// All methods take `&mut self` so that observers can be stored as
/// `Box<dyn Observer>` in subjects and join coordinators.
pub trait Observer<Item, Err> {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable
  fn error(&mut self, err: Err);

  /// Handle completion of the observable
  fn complete(&mut self);

  /// Returns `true` once the observer has received a terminal notification
  /// and will not accept more values.
  fn is_finished(&self) -> bool;
}

/// Boxed thread-safe observer.
pub type BoxedObserver<Item, Err> = Box<dyn Observer<Item, Err> + Send>;

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_finished(&self) -> bool { (**self).is_finished() }
}

/// Option observer - None ignores all events, Some delegates to inner.
/// Terminal notifications take the inner observer out.
impl<O, Item, Err> Observer<Item, Err> for Option<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(inner) = self {
      inner.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if let Some(mut inner) = self.take() {
      inner.error(err);
    }
  }

  fn complete(&mut self) {
    if let Some(mut inner) = self.take() {
      inner.complete();
    }
  }

  fn is_finished(&self) -> bool { self.as_ref().map_or(true, |o| o.is_finished()) }
}

// ============================================================================
// ObserverAll - Closure adapter
// ============================================================================

/// Observer built from three closures, one per notification kind.
///
/// Terminal closures run at most once, and nothing is forwarded after a
/// terminal notification.
#[derive(Clone)]
pub struct ObserverAll<N, E, C> {
  next: N,
  error: E,
  complete: C,
  finished: bool,
}

impl<N, E, C> ObserverAll<N, E, C> {
  #[inline(always)]
  pub fn new(next: N, error: E, complete: C) -> Self {
    ObserverAll { next, error, complete, finished: false }
  }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for ObserverAll<N, E, C>
where
  N: FnMut(Item),
  E: FnMut(Err),
  C: FnMut(),
{
  #[inline]
  fn next(&mut self, value: Item) {
    if !self.finished {
      (self.next)(value);
    }
  }

  fn error(&mut self, err: Err) {
    if !self.finished {
      self.finished = true;
      (self.error)(err);
    }
  }

  fn complete(&mut self) {
    if !self.finished {
      self.finished = true;
      (self.complete)();
    }
  }

  #[inline]
  fn is_finished(&self) -> bool { self.finished }
}
