use crate::{
  observable::Observable,
  observer::Observer,
  subscription::{SharedSubscription, SubscriptionLike},
};
use std::marker::PhantomData;

/// Creates an observable that emits no values and completes immediately.
pub fn empty<Item, Err>() -> Trivial<Item, Err> { Trivial::new(TrivialKind::Empty) }

/// Creates an observable that emits no values and errors immediately with
/// `err`.
pub fn throw<Item, Err>(err: Err) -> Trivial<Item, Err> { Trivial::new(TrivialKind::Throw(err)) }

/// Creates an observable that never emits anything, not even a terminal
/// notification.
pub fn never<Item, Err>() -> Trivial<Item, Err> { Trivial::new(TrivialKind::Never) }

#[derive(Clone)]
enum TrivialKind<Err> {
  Empty,
  Throw(Err),
  Never,
}

#[derive(Clone)]
pub struct Trivial<Item, Err> {
  kind: TrivialKind<Err>,
  _item: PhantomData<fn() -> Item>,
}

impl<Item, Err> Trivial<Item, Err> {
  fn new(kind: TrivialKind<Err>) -> Self { Trivial { kind, _item: PhantomData } }
}

impl<Item, Err> Observable for Trivial<Item, Err> {
  type Item = Item;
  type Err = Err;
  type Unsub = SharedSubscription;

  fn actual_subscribe<O>(self, mut observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let mut subscription = SharedSubscription::default();
    match self.kind {
      TrivialKind::Empty => {
        observer.complete();
        subscription.unsubscribe();
      }
      TrivialKind::Throw(err) => {
        observer.error(err);
        subscription.unsubscribe();
      }
      TrivialKind::Never => {}
    }
    subscription
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  #[test]
  fn empty_completes() {
    let completed = Arc::new(AtomicUsize::new(0));
    let c_completed = completed.clone();
    observable::empty::<i32, ()>().subscribe_complete(
      |_| unreachable!(),
      move || {
        c_completed.fetch_add(1, Ordering::SeqCst);
      },
    );
    assert_eq!(completed.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn throw_errors() {
    let errors = Arc::new(AtomicUsize::new(0));
    let c_errors = errors.clone();
    observable::throw::<i32, _>("boom").subscribe_err(
      |_| unreachable!(),
      move |e| {
        assert_eq!(e, "boom");
        c_errors.fetch_add(1, Ordering::SeqCst);
      },
    );
    assert_eq!(errors.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn never_stays_open() {
    let subscription = observable::never::<i32, ()>().subscribe(|_| unreachable!());
    assert!(!subscription.is_closed());
  }
}
