use crate::{
  observable::Observable,
  observer::{BoxedObserver, Observer},
  subscriber::Subscriber,
  subscription::SharedSubscription,
};
use std::marker::PhantomData;

/// Creates an observable from a producer function.
///
/// `subscribe` receives the subscriber of every new subscription. The
/// subscriber may be moved to another thread; once its subscription is
/// closed, emissions are dropped. Teardown logic is attached to
/// `subscriber.clone_subscription()`.
///
/// # Example
///
/// ```
/// use rxjoin::prelude::*;
///
/// observable::create(|mut subscriber: Subscriber<BoxedObserver<i32, ()>>| {
///   subscriber.next(1);
///   subscriber.next(2);
///   subscriber.complete();
/// })
/// .subscribe(|v| println!("{}", v));
/// ```
pub fn create<F, Item, Err>(subscribe: F) -> ObservableFn<F, Item, Err>
where
  F: FnOnce(Subscriber<BoxedObserver<Item, Err>>),
{
  ObservableFn(subscribe, PhantomData)
}

pub struct ObservableFn<F, Item, Err>(F, PhantomData<fn() -> (Item, Err)>);

impl<F: Clone, Item, Err> Clone for ObservableFn<F, Item, Err> {
  fn clone(&self) -> Self { ObservableFn(self.0.clone(), PhantomData) }
}

impl<F, Item, Err> Observable for ObservableFn<F, Item, Err>
where
  F: FnOnce(Subscriber<BoxedObserver<Item, Err>>),
  Item: 'static,
  Err: 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = SharedSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let subscriber = Subscriber::new(Box::new(observer) as BoxedObserver<Item, Err>);
    let subscription = subscriber.clone_subscription();
    (self.0)(subscriber);
    subscription
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  };

  #[test]
  fn proxy_call() {
    let next = Arc::new(AtomicUsize::new(0));
    let err = Arc::new(AtomicUsize::new(0));
    let complete = Arc::new(AtomicUsize::new(0));
    let (c_next, c_err, c_complete) = (next.clone(), err.clone(), complete.clone());

    observable::create(|mut subscriber: Subscriber<BoxedObserver<i32, ()>>| {
      subscriber.next(1);
      subscriber.next(2);
      subscriber.next(3);
      subscriber.complete();
      subscriber.next(3);
      subscriber.error(());
    })
    .subscribe_all(
      move |_| {
        c_next.fetch_add(1, Ordering::SeqCst);
      },
      move |_| {
        c_err.fetch_add(1, Ordering::SeqCst);
      },
      move || {
        c_complete.fetch_add(1, Ordering::SeqCst);
      },
    );

    assert_eq!(next.load(Ordering::SeqCst), 3);
    assert_eq!(complete.load(Ordering::SeqCst), 1);
    assert_eq!(err.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn teardown_runs_on_unsubscribe() {
    let torn_down = Arc::new(AtomicUsize::new(0));
    let values = Arc::new(Mutex::new(vec![]));
    let c_torn_down = torn_down.clone();
    let c_values = values.clone();

    let mut subscription = observable::create(move |mut subscriber: Subscriber<BoxedObserver<i32, ()>>| {
      let c_torn_down = c_torn_down.clone();
      subscriber.clone_subscription().add(ClosureSubscription::new(move || {
        c_torn_down.fetch_add(1, Ordering::SeqCst);
      }));
      subscriber.next(1);
    })
    .subscribe(move |v| c_values.lock().unwrap().push(v));

    subscription.unsubscribe();
    subscription.unsubscribe();
    assert_eq!(*values.lock().unwrap(), vec![1]);
    assert_eq!(torn_down.load(Ordering::SeqCst), 1);
  }
}
