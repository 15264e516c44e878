use crate::{
  observable::Observable,
  observer::{BoxedObserver, Observer},
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};
use std::marker::PhantomData;

/// Creates an observable that produces values from an iterator, then
/// completes.
///
/// # Examples
///
/// ```
/// use rxjoin::prelude::*;
///
/// observable::from_iter::<_, ()>(0..10).subscribe(|v| println!("{},", v));
/// ```
pub fn from_iter<Iter, Err>(iter: Iter) -> ObservableIter<Iter, Err>
where
  Iter: IntoIterator,
{
  ObservableIter(iter, PhantomData)
}

/// Emits a single value, then completes.
#[inline]
pub fn of<Item, Err>(value: Item) -> ObservableIter<std::iter::Once<Item>, Err> {
  from_iter(std::iter::once(value))
}

pub struct ObservableIter<Iter, Err>(Iter, PhantomData<fn() -> Err>);

impl<Iter: Clone, Err> Clone for ObservableIter<Iter, Err> {
  fn clone(&self) -> Self { ObservableIter(self.0.clone(), PhantomData) }
}

impl<Iter, Err> Observable for ObservableIter<Iter, Err>
where
  Iter: IntoIterator,
  Iter::Item: 'static,
  Err: 'static,
{
  type Item = Iter::Item;
  type Err = Err;
  type Unsub = SharedSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Self::Item, Err> + Send + 'static,
  {
    let mut subscriber = Subscriber::new(Box::new(observer) as BoxedObserver<Self::Item, Err>);
    for v in self.0 {
      if subscriber.is_closed() {
        break;
      }
      subscriber.next(v);
    }
    subscriber.complete();
    subscriber.clone_subscription()
  }
}
