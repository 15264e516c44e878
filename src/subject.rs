//! Subjects: observables that are also observers and multicast every
//! notification they receive to all their subscribers.
//!
//! Subjects are safe to share between threads. Emissions from several
//! threads are serialised, and an observer may subscribe or unsubscribe from
//! inside a callback: the change applies once the running broadcast is over.
//!
//! Emitting into a subject from one of its own callbacks is not supported
//! and panics.

use crate::{
  observable::{BoxedObservable, Observable, SourceId},
  observer::{BoxedObserver, Observer},
};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use smallvec::SmallVec;
use std::{
  cell::Cell,
  marker::PhantomData,
  sync::Arc,
};

mod behavior_subject;
mod replay_subject;
mod subject_subscription;
mod subscribers;

pub use behavior_subject::BehaviorSubject;
pub use replay_subject::ReplaySubject;
pub use subject_subscription::SubjectSubscription;
use subscribers::Subscribers;

const REENTRANT_EMISSION: &str = "re-entrant Subject emissions are not supported (next/error/complete); \
                                  emit from another thread or after the current callback returns";

/// The common surface of every subject kind, used by the multicast family.
pub trait SubjectLike<Item, Err>:
  Observer<Item, Err> + Observable<Item = Item, Err = Err> + Clone + Send + Sync + 'static
{
  /// `true` once the subject has received `error` or `complete`.
  fn is_stopped(&self) -> bool;

  fn subscriber_count(&self) -> usize;
}

/// A plain multicast subject.
pub struct Subject<Item, Err> {
  core: Arc<SubjectCore<Item, Err>>,
}

#[derive(Clone)]
enum Stopped<Err> {
  Completed,
  Errored(Err),
}

pub(crate) struct SubjectCore<Item, Err> {
  emission: ReentrantMutex<Cell<bool>>,
  state: Mutex<SubjectState<Item, Err>>,
}

struct SubjectState<Item, Err> {
  observers: Subscribers<BoxedObserver<Item, Err>>,
  pending: Subscribers<BoxedObserver<Item, Err>>,
  in_flight: SmallVec<[usize; 2]>,
  removed: SmallVec<[usize; 2]>,
  broadcasting: bool,
  stopped: Option<Stopped<Err>>,
  next_id: usize,
  _item: PhantomData<Item>,
}

/// Clears the emitting flag when a broadcast ends, even by unwinding.
struct EmissionReset<'a>(&'a Cell<bool>);

impl<'a> Drop for EmissionReset<'a> {
  fn drop(&mut self) { self.0.set(false); }
}

impl<Item, Err> SubjectCore<Item, Err> {
  pub(crate) fn remove_observer(&self, id: usize) -> Option<BoxedObserver<Item, Err>> {
    let mut state = self.state.lock();
    if state.broadcasting {
      if let Some(observer) = state.pending.remove(id) {
        return Some(observer);
      }
      state.removed.push(id);
      None
    } else {
      state.observers.remove(id)
    }
  }

  pub(crate) fn is_subscribed(&self, id: usize) -> bool {
    let state = self.state.lock();
    !state.removed.contains(&id)
      && (state.observers.contains(id) || state.pending.contains(id) || state.in_flight.contains(&id))
  }
}

impl<Item, Err> Subject<Item, Err> {
  pub fn new() -> Self {
    let state = SubjectState {
      observers: Subscribers::default(),
      pending: Subscribers::default(),
      in_flight: SmallVec::new(),
      removed: SmallVec::new(),
      broadcasting: false,
      stopped: None,
      next_id: 0,
      _item: PhantomData,
    };
    Subject {
      core: Arc::new(SubjectCore { emission: ReentrantMutex::new(Cell::new(false)), state: Mutex::new(state) }),
    }
  }

  /// Number of observers currently subscribed.
  pub fn subscriber_count(&self) -> usize {
    let state = self.core.state.lock();
    (state.observers.len() + state.in_flight.len() + state.pending.len())
      .saturating_sub(state.removed.len())
  }

  #[inline]
  pub fn is_stopped(&self) -> bool { self.core.state.lock().stopped.is_some() }

  /// Holds the emission gate, so no broadcast of this subject starts on
  /// another thread meanwhile. Re-entrant on the current thread.
  pub(crate) fn emission(&self) -> ReentrantMutexGuard<'_, Cell<bool>> { self.core.emission.lock() }

  #[inline]
  pub(crate) fn source_id(&self) -> SourceId { SourceId::of(&self.core) }

  fn broadcast<F>(&self, stop: Option<Stopped<Err>>, emit: F)
  where
    F: FnOnce(&mut Subscribers<BoxedObserver<Item, Err>>),
  {
    let gate = self.core.emission.lock();
    if gate.replace(true) {
      panic!("{}", REENTRANT_EMISSION);
    }
    let _reset = EmissionReset(&gate);

    let mut observers = {
      let mut state = self.core.state.lock();
      if state.stopped.is_some() {
        return;
      }
      if stop.is_some() {
        state.stopped = stop;
      }
      state.broadcasting = true;
      let observers = std::mem::take(&mut state.observers);
      state.in_flight = observers.ids().collect();
      observers
    };

    emit(&mut observers);

    let dropped = {
      let mut state = self.core.state.lock();
      state.broadcasting = false;
      state.in_flight.clear();
      let mut dropped = Vec::new();
      for id in std::mem::take(&mut state.removed) {
        dropped.extend(observers.remove(id));
      }
      dropped.extend(observers.drain_where(|o| Observer::<Item, Err>::is_finished(o)));
      let mut pending = std::mem::take(&mut state.pending);
      observers.append(&mut pending);
      state.observers = observers;
      dropped
    };
    drop(dropped);
  }

  fn add_observer(&self, mut observer: BoxedObserver<Item, Err>) -> SubjectSubscription<Item, Err>
  where
    Err: Clone,
  {
    let mut state = self.core.state.lock();
    match state.stopped.clone() {
      Some(stopped) => {
        drop(state);
        match stopped {
          Stopped::Completed => observer.complete(),
          Stopped::Errored(err) => observer.error(err),
        }
        SubjectSubscription::closed()
      }
      None => {
        let id = state.next_id;
        state.next_id += 1;
        if state.broadcasting {
          state.pending.insert(id, observer);
        } else {
          state.observers.insert(id, observer);
        }
        SubjectSubscription::new(Arc::downgrade(&self.core), id)
      }
    }
  }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Subject { core: self.core.clone() } }
}

impl<Item, Err> Observer<Item, Err> for Subject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    self.broadcast(None, |observers| observers.broadcast_value::<Item, Err>(value));
  }

  fn error(&mut self, err: Err) {
    self.broadcast(Some(Stopped::Errored(err.clone())), |observers| {
      observers.broadcast_error::<Item, Err>(err)
    });
  }

  fn complete(&mut self) {
    self.broadcast(Some(Stopped::Completed), |observers| {
      observers.broadcast_complete::<Item, Err>()
    });
  }

  #[inline]
  fn is_finished(&self) -> bool { self.is_stopped() }
}

impl<Item, Err> Observable for Subject<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = SubjectSubscription<Item, Err>;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    self.add_observer(Box::new(observer))
  }

  fn into_boxed(self) -> BoxedObservable<Item, Err>
  where
    Self: Clone + Send + Sync + 'static,
  {
    let id = self.source_id();
    BoxedObservable::with_id(self, id)
  }
}

impl<Item, Err> SubjectLike<Item, Err> for Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  #[inline]
  fn is_stopped(&self) -> bool { Subject::is_stopped(self) }

  #[inline]
  fn subscriber_count(&self) -> usize { Subject::subscriber_count(self) }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
      atomic::{AtomicUsize, Ordering},
      Arc, Mutex,
    },
    thread,
  };

  #[test]
  fn base_data_flow() {
    let i = Arc::new(AtomicUsize::new(0));
    let mut broadcast = Subject::<i32, ()>::new();
    let c_i = i.clone();
    broadcast.clone().subscribe(move |v| {
      c_i.fetch_add(v as usize, Ordering::SeqCst);
    });
    broadcast.next(1);
    broadcast.next(2);
    assert_eq!(i.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn error_reaches_every_subscriber() {
    let errors = Arc::new(AtomicUsize::new(0));
    let mut broadcast = Subject::<i32, String>::new();
    for _ in 0..3 {
      let c_errors = errors.clone();
      broadcast.clone().subscribe_err(
        |_| {},
        move |_| {
          c_errors.fetch_add(1, Ordering::SeqCst);
        },
      );
    }
    broadcast.error("boom".to_string());
    broadcast.next(1);
    assert_eq!(errors.load(Ordering::SeqCst), 3);
    assert_eq!(broadcast.subscriber_count(), 0);
  }

  #[test]
  fn late_subscriber_gets_terminal() {
    let mut subject = Subject::<i32, ()>::new();
    subject.complete();

    let completed = Arc::new(AtomicUsize::new(0));
    let c_completed = completed.clone();
    let subscription = subject.clone().subscribe_complete(
      |_| {},
      move || {
        c_completed.fetch_add(1, Ordering::SeqCst);
      },
    );
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert!(subscription.is_closed());
  }

  #[test]
  fn unsubscribe_removes_observer() {
    let values = Arc::new(Mutex::new(vec![]));
    let mut subject = Subject::<i32, ()>::new();
    let c_values = values.clone();
    let mut subscription = subject.clone().subscribe(move |v| c_values.lock().unwrap().push(v));
    subject.next(1);
    subscription.unsubscribe();
    subject.next(2);

    assert!(subscription.is_closed());
    assert_eq!(subject.subscriber_count(), 0);
    assert_eq!(*values.lock().unwrap(), vec![1]);
  }

  #[test]
  fn subscribe_during_broadcast_starts_with_next_value() {
    let values = Arc::new(Mutex::new(vec![]));
    let mut subject = Subject::<i32, ()>::new();
    let c_subject = subject.clone();
    let c_values = values.clone();
    let mut added = false;
    subject.clone().subscribe(move |_| {
      if !added {
        added = true;
        let c_values = c_values.clone();
        c_subject.clone().subscribe(move |v| c_values.lock().unwrap().push(v));
      }
    });

    subject.next(1);
    subject.next(2);
    assert_eq!(*values.lock().unwrap(), vec![2]);
  }

  #[test]
  fn unsubscribe_during_broadcast_is_deferred() {
    let values = Arc::new(Mutex::new(vec![]));
    let mut subject = Subject::<i32, ()>::new();
    let slot: Arc<Mutex<Option<SubjectSubscription<i32, ()>>>> = Arc::new(Mutex::new(None));

    let c_slot = slot.clone();
    let c_values = values.clone();
    let subscription = subject.clone().subscribe(move |v| {
      c_values.lock().unwrap().push(v);
      if let Some(mut s) = c_slot.lock().unwrap().take() {
        s.unsubscribe();
      }
    });
    *slot.lock().unwrap() = Some(subscription.into_inner());

    subject.next(1);
    subject.next(2);
    assert_eq!(*values.lock().unwrap(), vec![1]);
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[test]
  fn reentrant_next_panics() {
    let subject = Subject::<i32, ()>::new();
    subject.clone().subscribe({
      let subject = subject.clone();
      move |_| subject.clone().next(2)
    });

    let result = catch_unwind(AssertUnwindSafe(|| subject.clone().next(1)));
    assert!(result.is_err());
  }

  #[test]
  fn concurrent_emitters() {
    let count = Arc::new(AtomicUsize::new(0));
    let subject = Subject::<usize, ()>::new();
    let c_count = count.clone();
    subject.clone().subscribe(move |_| {
      c_count.fetch_add(1, Ordering::SeqCst);
    });

    let handles: Vec<_> = (0..4)
      .map(|_| {
        let mut subject = subject.clone();
        thread::spawn(move || (0..250).for_each(|v| subject.next(v)))
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(count.load(Ordering::SeqCst), 1000);
  }

  #[test]
  fn boxing_keeps_subject_identity() {
    let subject = Subject::<i32, ()>::new();
    assert_eq!(subject.clone().box_it().source_id(), subject.clone().box_it().source_id());
    assert_ne!(subject.box_it().source_id(), Subject::<i32, ()>::new().box_it().source_id());
  }
}
