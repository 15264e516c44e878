use super::{Subject, SubjectLike, SubjectSubscription};
use crate::{
  observable::{BoxedObservable, Observable, SourceId},
  observer::Observer,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// A subject holding a current value. Every new subscriber receives it first;
/// once the subject has terminated, only the terminal notification.
pub struct BehaviorSubject<Item, Err> {
  subject: Subject<Item, Err>,
  value: Arc<Mutex<Item>>,
}

impl<Item, Err> BehaviorSubject<Item, Err> {
  pub fn new(initial: Item) -> Self {
    BehaviorSubject { subject: Subject::new(), value: Arc::new(Mutex::new(initial)) }
  }

  pub fn value(&self) -> Item
  where
    Item: Clone,
  {
    self.value.lock().clone()
  }
}

impl<Item, Err> Clone for BehaviorSubject<Item, Err> {
  fn clone(&self) -> Self { BehaviorSubject { subject: self.subject.clone(), value: self.value.clone() } }
}

impl<Item, Err> Observer<Item, Err> for BehaviorSubject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    let gate = self.subject.clone();
    let _emission = gate.emission();
    if !self.subject.is_stopped() {
      *self.value.lock() = value.clone();
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

impl<Item, Err> Observable for BehaviorSubject<Item, Err>
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
    let _emission = self.subject.emission();
    if !self.subject.is_stopped() {
      observer.next(self.value());
    }
    self.subject.clone().actual_subscribe(observer)
  }

  fn into_boxed(self) -> BoxedObservable<Item, Err>
  where
    Self: Clone + Send + Sync + 'static,
  {
    let id = SourceId::of(&self.value);
    BoxedObservable::with_id(self, id)
  }
}

impl<Item, Err> SubjectLike<Item, Err> for BehaviorSubject<Item, Err>
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

  #[test]
  fn emits_current_value_first() {
    let mut subject = BehaviorSubject::<i32, ()>::new(0);
    let values = Arc::new(Mutex::new(vec![]));
    let c_values = values.clone();
    subject.clone().subscribe(move |v| c_values.lock().unwrap().push(v));
    subject.next(1);

    let late = Arc::new(Mutex::new(vec![]));
    let c_late = late.clone();
    subject.clone().subscribe(move |v| c_late.lock().unwrap().push(v));
    subject.next(2);

    assert_eq!(*values.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(*late.lock().unwrap(), vec![1, 2]);
    assert_eq!(subject.value(), 2);
  }

  #[test]
  fn stopped_subject_only_terminates() {
    let mut subject = BehaviorSubject::<i32, ()>::new(0);
    subject.complete();
    let values = Arc::new(Mutex::new(vec![]));
    let c_values = values.clone();
    subject.subscribe(move |v| c_values.lock().unwrap().push(v));
    assert!(values.lock().unwrap().is_empty());
  }
}
