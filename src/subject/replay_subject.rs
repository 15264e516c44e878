use super::{Subject, SubjectLike, SubjectSubscription};
use crate::{
  observable::{BoxedObservable, Observable, SourceId},
  observer::Observer,
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

/// A subject that records the values it receives and replays them to every
/// new subscriber before the live ones.
///
/// With `Some(n)` only the last `n` values are kept; with `None`, all of
/// them. The buffer survives termination: a late subscriber receives the
/// buffered values followed by the terminal notification.
pub struct ReplaySubject<Item, Err> {
  subject: Subject<Item, Err>,
  buffer: Arc<Mutex<ReplayBuffer<Item>>>,
}

struct ReplayBuffer<Item> {
  values: VecDeque<Item>,
  capacity: Option<usize>,
}

impl<Item> ReplayBuffer<Item> {
  fn push(&mut self, value: Item) {
    if self.capacity == Some(0) {
      return;
    }
    self.values.push_back(value);
    if let Some(capacity) = self.capacity {
      while self.values.len() > capacity {
        self.values.pop_front();
      }
    }
  }
}

impl<Item, Err> ReplaySubject<Item, Err> {
  pub fn new(capacity: Option<usize>) -> Self {
    ReplaySubject {
      subject: Subject::new(),
      buffer: Arc::new(Mutex::new(ReplayBuffer { values: VecDeque::new(), capacity })),
    }
  }

  /// Values a new subscriber would receive first.
  pub fn buffered(&self) -> Vec<Item>
  where
    Item: Clone,
  {
    self.buffer.lock().values.iter().cloned().collect()
  }
}

impl<Item, Err> Clone for ReplaySubject<Item, Err> {
  fn clone(&self) -> Self { ReplaySubject { subject: self.subject.clone(), buffer: self.buffer.clone() } }
}

impl<Item, Err> Observer<Item, Err> for ReplaySubject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    let gate = self.subject.clone();
    let _emission = gate.emission();
    if !self.subject.is_stopped() {
      self.buffer.lock().push(value.clone());
    }
    self.subject.next(value);
  }

  #[inline]
  fn error(&mut self, err: Err) { self.subject.error(err) }

  #[inline]
  fn complete(&mut self) { self.subject.complete() }

  #[inline]
  fn is_finished(&self) -> bool { self.subject.is_stopped() }
}

impl<Item, Err> Observable for ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = SubjectSubscription<Item, Err>;

  fn actual_subscribe<O>(self, mut observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    // Replay and registration share the emission gate: a concurrent value is
    // either replayed or broadcast to the new observer, never both.
    let _emission = self.subject.emission();
    let replay = self.buffered();
    for v in replay {
      observer.next(v);
    }
    self.subject.clone().actual_subscribe(observer)
  }

  fn into_boxed(self) -> BoxedObservable<Item, Err>
  where
    Self: Clone + Send + Sync + 'static,
  {
    let id = SourceId::of(&self.buffer);
    BoxedObservable::with_id(self, id)
  }
}

impl<Item, Err> SubjectLike<Item, Err> for ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  #[inline]
  fn is_stopped(&self) -> bool { self.subject.is_stopped() }

  #[inline]
  fn subscriber_count(&self) -> usize { self.subject.subscriber_count() }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::sync::{Arc, Mutex};

  fn collect(subject: &ReplaySubject<i32, ()>) -> (Arc<Mutex<Vec<i32>>>, Arc<Mutex<bool>>) {
    let values = Arc::new(Mutex::new(vec![]));
    let completed = Arc::new(Mutex::new(false));
    let (c_values, c_completed) = (values.clone(), completed.clone());
    subject.clone().subscribe_complete(
      move |v| c_values.lock().unwrap().push(v),
      move || *c_completed.lock().unwrap() = true,
    );
    (values, completed)
  }

  #[test]
  fn bounded_replay() {
    let mut subject = ReplaySubject::<i32, ()>::new(Some(2));
    subject.next(1);
    subject.next(2);
    subject.next(3);

    let (values, _) = collect(&subject);
    subject.next(4);
    assert_eq!(*values.lock().unwrap(), vec![2, 3, 4]);
  }

  #[test]
  fn unbounded_replay_after_complete() {
    let mut subject = ReplaySubject::<i32, ()>::new(None);
    (0..5).for_each(|v| subject.next(v));
    subject.complete();

    let (values, completed) = collect(&subject);
    assert_eq!(*values.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert!(*completed.lock().unwrap());
  }
}
