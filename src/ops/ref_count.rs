//! Make a ConnectableObservable behave like an ordinary observable and
//! automate the way you connect to it.
//!
//! Internally it counts the subscriptions to the observable and connects
//! (only once) when the count goes from zero to one. When the count drops
//! back to zero, it disconnects from the source. This way everything before
//! the refCount has a single subscription, independently of the number of
//! subscribers to the target observable.
//!
//! `share` is exactly `multicast_factory(Subject::new)` followed by
//! `ref_count`.

use crate::{
  observable::{BoxedObservable, Connection, ConnectableObservable, Observable, SourceId},
  observer::Observer,
  subject::SubjectLike,
  subscription::SubscriptionLike,
};
use parking_lot::Mutex;
use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};
use tracing::debug;

pub struct RefCount<Source, Sub> {
  connectable: ConnectableObservable<Source, Sub>,
  state: Arc<Mutex<RefCountState>>,
}

#[derive(Default)]
struct RefCountState {
  count: usize,
  connection: Option<Connection>,
}

impl<Source, Sub> Clone for RefCount<Source, Sub> {
  fn clone(&self) -> Self { RefCount { connectable: self.connectable.clone(), state: self.state.clone() } }
}

impl<Source, Sub> RefCount<Source, Sub> {
  pub(crate) fn new(connectable: ConnectableObservable<Source, Sub>) -> Self {
    RefCount { connectable, state: Arc::new(Mutex::new(RefCountState::default())) }
  }

  /// Number of live subscriptions.
  pub fn subscriber_count(&self) -> usize { self.state.lock().count }

  /// Id of the connection held on behalf of the subscribers, if any.
  pub fn connection_id(&self) -> Option<usize> {
    self.state.lock().connection.as_ref().map(Connection::id)
  }
}

impl<Source, Sub> Observable for RefCount<Source, Sub>
where
  Source: Observable + Clone,
  Source::Item: 'static,
  Source::Err: 'static,
  Sub: SubjectLike<Source::Item, Source::Err>,
{
  type Item = Source::Item;
  type Err = Source::Err;
  type Unsub = RefCountSubscription<Sub::Unsub>;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let release = Release { state: self.state.clone(), released: Arc::new(AtomicBool::new(false)) };
    let needs_connect = {
      let mut state = self.state.lock();
      state.count += 1;
      debug!(count = state.count, "ref_count subscribed");
      state.connection.as_ref().map_or(true, SubscriptionLike::is_closed)
    };

    let subscription = self
      .connectable
      .clone()
      .actual_subscribe(RefCountObserver { observer, release: release.clone() });

    if needs_connect {
      // `connect` may run the whole source synchronously, so the lock is not
      // held across it.
      let connection = self.connectable.connect();
      let stale = {
        let mut state = self.state.lock();
        if state.count == 0 {
          Some(connection)
        } else {
          if state.connection.as_ref().map_or(true, SubscriptionLike::is_closed) {
            state.connection = Some(connection);
          }
          None
        }
      };
      if let Some(mut connection) = stale {
        debug!(connection = connection.id(), "ref_count dropped before connect returned");
        connection.unsubscribe();
      }
    }

    RefCountSubscription { subscription, release }
  }

  fn into_boxed(self) -> BoxedObservable<Self::Item, Self::Err>
  where
    Self: Clone + Send + Sync + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    let id = SourceId::of(&self.state);
    BoxedObservable::with_id(self, id)
  }
}

/// Gives one subscription's share back, once.
#[derive(Clone)]
struct Release {
  state: Arc<Mutex<RefCountState>>,
  released: Arc<AtomicBool>,
}

impl Release {
  fn release(&self) {
    if self.released.swap(true, Ordering::AcqRel) {
      return;
    }
    let connection = {
      let mut state = self.state.lock();
      state.count = state.count.saturating_sub(1);
      debug!(count = state.count, "ref_count released");
      if state.count == 0 {
        state.connection.take()
      } else {
        None
      }
    };
    if let Some(mut connection) = connection {
      debug!(connection = connection.id(), "ref_count disconnecting");
      connection.unsubscribe();
    }
  }

  #[inline]
  fn is_released(&self) -> bool { self.released.load(Ordering::Acquire) }
}

struct RefCountObserver<O> {
  observer: O,
  release: Release,
}

impl<Item, Err, O> Observer<Item, Err> for RefCountObserver<O>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) { self.observer.next(value) }

  fn error(&mut self, err: Err) {
    self.observer.error(err);
    self.release.release();
  }

  fn complete(&mut self) {
    self.observer.complete();
    self.release.release();
  }

  #[inline]
  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

pub struct RefCountSubscription<U> {
  subscription: U,
  release: Release,
}

impl<U: SubscriptionLike> SubscriptionLike for RefCountSubscription<U> {
  fn unsubscribe(&mut self) {
    self.subscription.unsubscribe();
    self.release.release();
  }

  #[inline]
  fn is_closed(&self) -> bool { self.release.is_released() }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  };

  /// A source forwarding `feed`, counting its subscriptions.
  fn counted(
    feed: &Subject<i32, ()>, subscribed: &Arc<AtomicUsize>,
  ) -> impl Observable<Item = i32, Err = (), Unsub = SharedSubscription> + Clone + Send + Sync + 'static {
    let feed = feed.clone();
    let subscribed = subscribed.clone();
    observable::create(move |subscriber: Subscriber<BoxedObserver<i32, ()>>| {
      subscribed.fetch_add(1, Ordering::SeqCst);
      let upstream = feed.clone().actual_subscribe(subscriber.observer);
      subscriber.subscription.add(upstream);
    })
  }

  #[test]
  fn connects_once_and_disconnects_at_zero() {
    let mut feed = Subject::new();
    let subscribed = Arc::new(AtomicUsize::new(0));
    let shared = counted(&feed, &subscribed).publish().ref_count();

    let values = Arc::new(Mutex::new(vec![]));
    let c_values = values.clone();
    let mut first = shared.clone().subscribe(move |v| c_values.lock().unwrap().push(v));
    let mut second = shared.clone().subscribe(|_| {});
    assert_eq!(subscribed.load(Ordering::SeqCst), 1);
    assert_eq!(shared.subscriber_count(), 2);
    let connection = shared.connection_id();
    assert!(connection.is_some());

    feed.next(1);
    first.unsubscribe();
    first.unsubscribe();
    assert_eq!(shared.subscriber_count(), 1);
    assert_eq!(feed.subscriber_count(), 1);

    second.unsubscribe();
    assert_eq!(shared.subscriber_count(), 0);
    assert_eq!(shared.connection_id(), None);
    assert_eq!(feed.subscriber_count(), 0);

    let _third = shared.clone().subscribe(|_| {});
    assert_eq!(subscribed.load(Ordering::SeqCst), 2);
    assert!(shared.connection_id().is_some());
    assert_ne!(shared.connection_id(), connection);
    assert_eq!(*values.lock().unwrap(), vec![1]);
  }

  #[test]
  fn share_reconnects_after_source_completes() {
    let subscribed = Arc::new(AtomicUsize::new(0));
    let c_subscribed = subscribed.clone();
    let shared = observable::create(move |mut subscriber: Subscriber<BoxedObserver<i32, ()>>| {
      c_subscribed.fetch_add(1, Ordering::SeqCst);
      subscriber.next(1);
      subscriber.next(2);
      subscriber.complete();
    })
    .share();

    let values = Arc::new(Mutex::new(vec![]));
    for _ in 0..2 {
      let c_values = values.clone();
      shared.clone().subscribe(move |v| c_values.lock().unwrap().push(v));
      assert_eq!(shared.subscriber_count(), 0);
      assert_eq!(shared.connection_id(), None);
    }
    assert_eq!(subscribed.load(Ordering::SeqCst), 2);
    assert_eq!(*values.lock().unwrap(), vec![1, 2, 1, 2]);
  }

  #[test]
  fn share_replay_uses_one_upstream_subscription() {
    let mut feed = Subject::new();
    let subscribed = Arc::new(AtomicUsize::new(0));
    let shared = counted(&feed, &subscribed).share_replay(Some(2));

    let early = Arc::new(Mutex::new(vec![]));
    let c_early = early.clone();
    let _early = shared.clone().subscribe(move |v| c_early.lock().unwrap().push(v));
    (1..=3).for_each(|v| feed.next(v));

    let late = Arc::new(Mutex::new(vec![]));
    let c_late = late.clone();
    let _late = shared.clone().subscribe(move |v| c_late.lock().unwrap().push(v));
    feed.next(4);

    assert_eq!(subscribed.load(Ordering::SeqCst), 1);
    assert_eq!(*early.lock().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(*late.lock().unwrap(), vec![2, 3, 4]);
  }

  #[test]
  fn concurrent_subscribers_share_one_connection() {
    let feed = Subject::new();
    let subscribed = Arc::new(AtomicUsize::new(0));
    let shared = counted(&feed, &subscribed).share();

    let handles: Vec<_> = (0..8)
      .map(|_| {
        let shared = shared.clone();
        std::thread::spawn(move || shared.subscribe(|_| {}).into_inner())
      })
      .collect();
    let mut subscriptions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(subscribed.load(Ordering::SeqCst), 1);
    assert_eq!(shared.subscriber_count(), 8);

    subscriptions.iter_mut().for_each(|s| s.unsubscribe());
    assert_eq!(shared.subscriber_count(), 0);
    assert_eq!(feed.subscriber_count(), 0);
  }

  #[test]
  fn plans_over_clones_consume_each_value_once() {
    let mut feed = Subject::new();
    let subscribed = Arc::new(AtomicUsize::new(0));
    let shared = counted(&feed, &subscribed).share();
    let mut left = Subject::<i32, ()>::new();
    let mut right = Subject::<i32, ()>::new();

    let values = Arc::new(Mutex::new(vec![]));
    let c_values = values.clone();
    let mut subscription = when([
      shared.clone().and(left.clone()).then(|s, v| format!("l{}{}", s, v)),
      shared.clone().and(right.clone()).then(|s, v| format!("r{}{}", s, v)),
    ])
    .subscribe(move |v| c_values.lock().unwrap().push(v));
    assert_eq!(shared.subscriber_count(), 1);

    feed.next(1);
    left.next(1);
    right.next(1);
    feed.next(2);
    assert_eq!(*values.lock().unwrap(), vec!["l11", "r21"]);
    assert_eq!(subscribed.load(Ordering::SeqCst), 1);

    subscription.unsubscribe();
    assert_eq!(shared.subscriber_count(), 0);
    assert_eq!(feed.subscriber_count(), 0);
  }
}
