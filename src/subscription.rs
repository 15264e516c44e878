use parking_lot::Mutex;
use smallvec::SmallVec;
use std::{
  any::Any,
  fmt::{Debug, Formatter},
  sync::Arc,
};

/// A handle to a running subscription.
///
/// `unsubscribe` must be idempotent: calling it a second time is a no-op.
pub trait SubscriptionLike {
  /// Stops delivery before the source has terminated on its own.
  fn unsubscribe(&mut self);

  fn is_closed(&self) -> bool;
}

/// Boxed thread-safe subscription.
pub type BoxedSubscription = Box<dyn SubscriptionLike + Send>;

impl Debug for Box<dyn SubscriptionLike + Send> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Box<dyn SubscriptionLike>")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

/// A composite, cloneable subscription. Every clone refers to the same
/// teardown list; unsubscribing any clone unsubscribes every added child
/// exactly once. Children added after closing are unsubscribed immediately.
#[derive(Clone, Debug, Default)]
pub struct SharedSubscription(Arc<Mutex<Inner<BoxedSubscription>>>);

impl SharedSubscription {
  pub fn add<S: SubscriptionLike + Send + 'static>(&self, subscription: S) {
    if self.is_same(&subscription) {
      return;
    }
    let mut subscription: BoxedSubscription = Box::new(subscription);
    {
      let mut inner = self.0.lock();
      if !inner.closed {
        inner.teardown.retain(|v| !v.is_closed());
        inner.teardown.push(subscription);
        return;
      }
    }
    subscription.unsubscribe();
  }

  pub fn teardown_size(&self) -> usize { self.0.lock().teardown.len() }

  fn is_same(&self, other: &dyn Any) -> bool {
    if let Some(other) = other.downcast_ref::<Self>() {
      Arc::ptr_eq(&self.0, &other.0)
    } else {
      false
    }
  }
}

impl SubscriptionLike for SharedSubscription {
  fn unsubscribe(&mut self) {
    // Children are released outside the lock, they may reach back into us.
    let teardown = {
      let mut inner = self.0.lock();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };
    for mut v in teardown {
      v.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.lock().closed }
}

struct Inner<T> {
  closed: bool,
  teardown: SmallVec<[T; 1]>,
}

impl<T> Debug for Inner<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Inner")
      .field("closed", &self.closed)
      .field("teardown_count", &self.teardown.len())
      .finish()
  }
}

impl<T> Default for Inner<T> {
  fn default() -> Self { Inner { closed: false, teardown: SmallVec::new() } }
}

/// Runs a closure once, on the first `unsubscribe`.
pub struct ClosureSubscription<F>(Option<F>);

impl<F: FnOnce()> ClosureSubscription<F> {
  pub fn new(f: F) -> Self { ClosureSubscription(Some(f)) }
}

impl<F: FnOnce()> SubscriptionLike for ClosureSubscription<F> {
  fn unsubscribe(&mut self) {
    if let Some(f) = self.0.take() {
      f()
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_none() }
}

impl<T: ?Sized> SubscriptionLike for Box<T>
where
  T: SubscriptionLike,
{
  #[inline]
  fn unsubscribe(&mut self) {
    let s = &mut **self;
    s.unsubscribe()
  }

  #[inline]
  fn is_closed(&self) -> bool {
    let s = &**self;
    s.is_closed()
  }
}

impl<T: SubscriptionLike> SubscriptionLike for Option<T> {
  fn unsubscribe(&mut self) {
    if let Some(mut inner) = self.take() {
      inner.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.as_ref().map_or(true, SubscriptionLike::is_closed) }
}

/// What the `subscribe*` helpers return: a plain subscription handle that can
/// opt into unsubscribe-on-drop.
pub struct SubscriptionWrapper<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionWrapper<T> {
  /// Turns the handle into a guard that unsubscribes when dropped. A guard
  /// bound to `_` is dropped, and so unsubscribed, on the spot.
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<T> { SubscriptionGuard(self.0) }

  pub fn into_inner(self) -> T { self.0 }
}

impl<T: SubscriptionLike> SubscriptionLike for SubscriptionWrapper<T> {
  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
  #[inline]
  fn unsubscribe(&mut self) { self.0.unsubscribe() }
}

/// Unsubscribes the wrapped subscription when it goes out of scope.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}
