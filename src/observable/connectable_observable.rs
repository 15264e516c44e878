use crate::{
  observable::{BoxedObservable, Observable, SourceId},
  observer::Observer,
  ops::ref_count::RefCount,
  subject::SubjectLike,
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};
use parking_lot::Mutex;
use std::{
  fmt::{Debug, Formatter},
  marker::PhantomData,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Weak,
  },
};
use tracing::debug;

/// An observable that shares one subscription of its source through a
/// subject, but only once [`ConnectableObservable::connect`] is called.
///
/// Subscribing to a connectable subscribes to its current subject and never
/// touches the source. Clones share the subject and the connection.
pub struct ConnectableObservable<Source, Sub> {
  inner: Arc<ConnectableInner<Source, Sub>>,
}

struct ConnectableInner<Source, Sub> {
  source: Source,
  subject: Mutex<Sub>,
  factory: Option<Box<dyn Fn() -> Sub + Send + Sync>>,
  connection: Arc<Mutex<Option<ConnectionRecord>>>,
  next_id: AtomicUsize,
}

struct ConnectionRecord {
  id: usize,
  subscription: SharedSubscription,
}

/// The live link between a connectable observable and its source.
///
/// Every `connect` call made while connected returns a clone of the same
/// connection. Unsubscribing it, from any clone, stops the source; the
/// subject and its subscribers are left alone.
#[derive(Clone)]
pub struct Connection {
  id: usize,
  subscription: SharedSubscription,
  slot: Arc<Mutex<Option<ConnectionRecord>>>,
}

impl Connection {
  /// Identifies the connection cycle: equal ids are the same connection.
  #[inline]
  pub fn id(&self) -> usize { self.id }
}

impl Debug for Connection {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Connection")
      .field("id", &self.id)
      .field("closed", &self.subscription.is_closed())
      .finish()
  }
}

impl SubscriptionLike for Connection {
  fn unsubscribe(&mut self) {
    clear_slot(&self.slot, self.id);
    self.subscription.unsubscribe();
  }

  #[inline]
  fn is_closed(&self) -> bool { self.subscription.is_closed() }
}

fn clear_slot(slot: &Mutex<Option<ConnectionRecord>>, id: usize) {
  let mut slot = slot.lock();
  if slot.as_ref().map(|r| r.id) == Some(id) {
    debug!(connection = id, "connection released");
    *slot = None;
  }
}

impl<Source, Sub> Clone for ConnectableObservable<Source, Sub> {
  fn clone(&self) -> Self { ConnectableObservable { inner: self.inner.clone() } }
}

impl<Source, Sub> ConnectableObservable<Source, Sub> {
  /// Multicasts through `subject` for the whole life of the connectable.
  pub fn new(source: Source, subject: Sub) -> Self { Self::build(source, subject, None) }

  /// Multicasts through subjects made by `factory`. A terminated subject is
  /// replaced by a fresh one the next time a subject is needed, so a later
  /// connection cycle starts clean.
  pub fn with_factory<F>(source: Source, factory: F) -> Self
  where
    F: Fn() -> Sub + Send + Sync + 'static,
  {
    let subject = factory();
    Self::build(source, subject, Some(Box::new(factory)))
  }

  fn build(source: Source, subject: Sub, factory: Option<Box<dyn Fn() -> Sub + Send + Sync>>) -> Self {
    ConnectableObservable {
      inner: Arc::new(ConnectableInner {
        source,
        subject: Mutex::new(subject),
        factory,
        connection: Arc::new(Mutex::new(None)),
        next_id: AtomicUsize::new(0),
      }),
    }
  }

  /// The current connection, if connected.
  pub fn connection(&self) -> Option<Connection> {
    let slot = self.inner.connection.lock();
    slot.as_ref().map(|record| Connection {
      id: record.id,
      subscription: record.subscription.clone(),
      slot: self.inner.connection.clone(),
    })
  }

  #[inline]
  pub fn is_connected(&self) -> bool { self.inner.connection.lock().is_some() }

  /// Makes this connectable behave like an ordinary observable: it connects
  /// with the first subscriber and disconnects after the last one leaves.
  pub fn ref_count(self) -> RefCount<Source, Sub> { RefCount::new(self) }
}

impl<Source, Sub> ConnectableObservable<Source, Sub>
where
  Source: Observable + Clone,
  Sub: SubjectLike<Source::Item, Source::Err>,
{
  pub(crate) fn current_subject(&self) -> Sub {
    let mut subject = self.inner.subject.lock();
    if let Some(factory) = &self.inner.factory {
      if subject.is_stopped() {
        *subject = factory();
      }
    }
    subject.clone()
  }

  /// Subscribes the subject to the source, if not done already.
  ///
  /// Idempotent while connected: the existing connection is returned and the
  /// source is not subscribed a second time. After the connection has been
  /// unsubscribed, or the source has terminated, the next call starts a new
  /// connection.
  pub fn connect(&self) -> Connection
  where
    Source::Item: 'static,
    Source::Err: 'static,
  {
    let (id, subscription) = {
      let mut slot = self.inner.connection.lock();
      if let Some(record) = slot.as_ref() {
        return Connection {
          id: record.id,
          subscription: record.subscription.clone(),
          slot: self.inner.connection.clone(),
        };
      }
      let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
      let subscription = SharedSubscription::default();
      *slot = Some(ConnectionRecord { id, subscription: subscription.clone() });
      (id, subscription)
    };
    debug!(connection = id, "connecting source");

    let bridge = ConnectBridge {
      subject: self.current_subject(),
      slot: Arc::downgrade(&self.inner.connection),
      id,
      _marker: PhantomData,
    };
    let upstream = self
      .inner
      .source
      .clone()
      .actual_subscribe(Subscriber::with_subscription(bridge, subscription.clone()));
    subscription.add(upstream);

    Connection { id, subscription, slot: self.inner.connection.clone() }
  }
}

impl<Source, Sub> Observable for ConnectableObservable<Source, Sub>
where
  Source: Observable + Clone,
  Sub: SubjectLike<Source::Item, Source::Err>,
{
  type Item = Source::Item;
  type Err = Source::Err;
  type Unsub = Sub::Unsub;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    self.current_subject().actual_subscribe(observer)
  }

  /// Clones box to one source: joins queue their values once.
  fn into_boxed(self) -> BoxedObservable<Self::Item, Self::Err>
  where
    Self: Clone + Send + Sync + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    let id = SourceId::of(&self.inner);
    BoxedObservable::with_id(self, id)
  }
}

/// Feeds the subject from the source. When the source terminates on its own
/// the connection slot is cleared before the subject is told, so the
/// subject's subscribers already see the connectable as disconnected.
struct ConnectBridge<Sub, Item, Err> {
  subject: Sub,
  slot: Weak<Mutex<Option<ConnectionRecord>>>,
  id: usize,
  _marker: PhantomData<fn(Item, Err)>,
}

impl<Sub, Item, Err> ConnectBridge<Sub, Item, Err> {
  fn release(&self) {
    if let Some(slot) = self.slot.upgrade() {
      clear_slot(&slot, self.id);
    }
  }
}

impl<Sub, Item, Err> Observer<Item, Err> for ConnectBridge<Sub, Item, Err>
where
  Sub: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) { self.subject.next(value) }

  fn error(&mut self, err: Err) {
    self.release();
    self.subject.error(err)
  }

  fn complete(&mut self) {
    self.release();
    self.subject.complete()
  }

  #[inline]
  fn is_finished(&self) -> bool { self.subject.is_finished() }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  };

  #[test]
  fn smoke() {
    let connected = observable::of::<_, ()>(100).publish();
    let first = Arc::new(Mutex::new(0));
    let second = Arc::new(Mutex::new(0));
    let (c_first, c_second) = (first.clone(), second.clone());
    connected.clone().subscribe(move |v| *c_first.lock().unwrap() = v);
    connected.clone().subscribe(move |v| *c_second.lock().unwrap() = v);

    connected.connect();
    assert_eq!(*first.lock().unwrap(), 100);
    assert_eq!(*second.lock().unwrap(), 100);
  }

  #[test]
  fn nothing_before_connect() {
    let subscribed = Arc::new(AtomicUsize::new(0));
    let c_subscribed = subscribed.clone();
    let source = observable::create(move |_: Subscriber<BoxedObserver<i32, ()>>| {
      c_subscribed.fetch_add(1, Ordering::SeqCst);
    });
    let connectable = source.publish();
    connectable.clone().subscribe(|_| {});
    connectable.clone().subscribe(|_| {});
    assert_eq!(subscribed.load(Ordering::SeqCst), 0);

    connectable.connect();
    assert_eq!(subscribed.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn connect_is_idempotent() {
    let mut subject = Subject::<i32, ()>::new();
    let subscribed = Arc::new(AtomicUsize::new(0));
    let c_subscribed = subscribed.clone();
    let c_subject = subject.clone();
    let source = observable::create(move |subscriber: Subscriber<BoxedObserver<i32, ()>>| {
      c_subscribed.fetch_add(1, Ordering::SeqCst);
      let upstream = c_subject.clone().actual_subscribe(subscriber.observer);
      subscriber.subscription.add(upstream);
    });

    let connectable = source.publish();
    let values = Arc::new(Mutex::new(vec![]));
    let c_values = values.clone();
    connectable.clone().subscribe(move |v| c_values.lock().unwrap().push(v));

    let first = connectable.connect();
    let second = connectable.connect();
    assert_eq!(first.id(), second.id());
    assert_eq!(subscribed.load(Ordering::SeqCst), 1);

    subject.next(1);
    first.clone().unsubscribe();
    assert!(second.is_closed());
    assert!(!connectable.is_connected());
    subject.next(2);
    assert_eq!(*values.lock().unwrap(), vec![1]);

    let third = connectable.connect();
    assert_ne!(third.id(), first.id());
    assert_eq!(subscribed.load(Ordering::SeqCst), 2);
    subject.next(3);
    assert_eq!(*values.lock().unwrap(), vec![1, 3]);
  }

  #[test]
  fn source_completion_disconnects() {
    let connectable = observable::from_iter::<_, ()>(vec![1, 2]).publish();
    let completed = Arc::new(AtomicUsize::new(0));
    let c_completed = completed.clone();
    connectable.clone().subscribe_complete(
      |_| {},
      move || {
        c_completed.fetch_add(1, Ordering::SeqCst);
      },
    );

    let connection = connectable.connect();
    assert!(connection.is_closed());
    assert!(!connectable.is_connected());
    assert_eq!(completed.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn factory_replaces_terminated_subject() {
    let connectable = observable::from_iter::<_, ()>(vec![1, 2]).multicast_factory(Subject::new);
    let values = Arc::new(Mutex::new(vec![]));

    for _ in 0..2 {
      let c_values = values.clone();
      connectable.clone().subscribe(move |v| c_values.lock().unwrap().push(v));
      connectable.connect();
    }
    assert_eq!(*values.lock().unwrap(), vec![1, 2, 1, 2]);
  }

  #[test]
  fn disposing_a_connection_twice_is_a_no_op() {
    let mut feed = Subject::<i32, ()>::new();
    let connectable = feed.clone().publish();
    let values = Arc::new(Mutex::new(vec![]));
    let c_values = values.clone();
    connectable.clone().subscribe(move |v| c_values.lock().unwrap().push(v));

    let mut first = connectable.connect();
    let mut twin = first.clone();
    first.unsubscribe();
    first.unsubscribe();
    twin.unsubscribe();
    assert!(twin.is_closed());
    assert!(!connectable.is_connected());
    assert_eq!(feed.subscriber_count(), 0);

    let current = connectable.connect();
    assert_ne!(current.id(), first.id());
    twin.unsubscribe();
    first.unsubscribe();
    assert!(connectable.is_connected());
    assert_eq!(connectable.connection().map(|c| c.id()), Some(current.id()));
    assert_eq!(feed.subscriber_count(), 1);

    feed.next(1);
    assert_eq!(*values.lock().unwrap(), vec![1]);
  }

  #[test]
  fn joined_clones_share_one_subscription() {
    let mut feed = Subject::<i32, ()>::new();
    let published = feed.clone().publish();
    let pairs = Arc::new(Mutex::new(vec![]));
    let c_pairs = pairs.clone();
    when([published.clone().and(published.clone()).then(|x, y| (x, y))])
      .subscribe(move |pair| c_pairs.lock().unwrap().push(pair));
    assert_eq!(published.clone().box_it().source_id(), published.clone().box_it().source_id());

    published.connect();
    (1..=4).for_each(|v| feed.next(v));
    assert_eq!(*pairs.lock().unwrap(), vec![(1, 2), (3, 4)]);
  }
}
