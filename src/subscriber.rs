use crate::{
  observer::Observer,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Implements the Observer trait and Subscription trait. While the Observer is
/// the public API for consuming the values of an Observable, sources wrap every
/// observer in a Subscriber, in order to provide Subscription capabilities.
///
/// Once the subscription is closed, either by a terminal notification or by
/// `unsubscribe`, nothing reaches the wrapped observer any more.
pub struct Subscriber<O> {
  pub(crate) observer: O,
  pub(crate) subscription: SharedSubscription,
}

impl<O> Subscriber<O> {
  pub fn new(observer: O) -> Self {
    Subscriber { observer, subscription: SharedSubscription::default() }
  }

  #[inline]
  pub fn with_subscription(observer: O, subscription: SharedSubscription) -> Self {
    Subscriber { observer, subscription }
  }

  #[inline(always)]
  pub fn clone_subscription(&self) -> SharedSubscription { self.subscription.clone() }
}

impl<Item, Err, O> Observer<Item, Err> for Subscriber<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if !self.subscription.is_closed() {
      self.observer.next(value)
    }
  }

  fn error(&mut self, err: Err) {
    if !self.subscription.is_closed() {
      self.subscription.unsubscribe();
      self.observer.error(err);
    }
  }

  fn complete(&mut self) {
    if !self.subscription.is_closed() {
      self.subscription.unsubscribe();
      self.observer.complete();
    }
  }

  #[inline]
  fn is_finished(&self) -> bool { self.subscription.is_closed() || self.observer.is_finished() }
}

impl<O> SubscriptionLike for Subscriber<O> {
  #[inline(always)]
  fn unsubscribe(&mut self) { self.subscription.unsubscribe(); }

  #[inline(always)]
  fn is_closed(&self) -> bool { self.subscription.is_closed() }
}
