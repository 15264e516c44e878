use super::when::WhenCore;
use crate::{
  notification::{Notification, NotificationKind},
  observable::{BoxedObservable, Observable, SourceId},
  observer::Observer,
  subscription::{BoxedSubscription, SharedSubscription},
};
use std::{
  any::Any,
  collections::{HashMap, VecDeque},
  sync::Arc,
};

/// A join queue with its item type erased, so queues of every source of a
/// `when` live in one table.
pub(crate) trait ErasedQueue: Send {
  fn len(&self) -> usize;

  /// Kind of the entry `depth` places from the front.
  fn kind_at(&self, depth: usize) -> Option<NotificationKind>;

  fn clear(&mut self);

  fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct JoinQueue<T, Err> {
  entries: VecDeque<Notification<T, Err>>,
}

impl<T, Err> JoinQueue<T, Err> {
  pub(crate) fn new() -> Self { JoinQueue { entries: VecDeque::new() } }
}

impl<T: Send + 'static, Err: Send + 'static> ErasedQueue for JoinQueue<T, Err> {
  #[inline]
  fn len(&self) -> usize { self.entries.len() }

  #[inline]
  fn kind_at(&self, depth: usize) -> Option<NotificationKind> {
    self.entries.get(depth).map(Notification::kind)
  }

  #[inline]
  fn clear(&mut self) { self.entries.clear(); }

  #[inline]
  fn as_any_mut(&mut self) -> &mut dyn Any { self }
}

/// One distinct source of a `when`: its queue, how many active plans still
/// read it, and the subscription to the source.
pub(crate) struct Slot {
  queue: Box<dyn ErasedQueue>,
  pub(crate) plans: usize,
  pub(crate) completed: bool,
  pub(crate) released: bool,
  pub(crate) subscription: Option<SharedSubscription>,
}

impl Slot {
  fn new<T: Send + 'static, Err: Send + 'static>() -> Self {
    Slot {
      queue: Box::new(JoinQueue::<T, Err>::new()),
      plans: 0,
      completed: false,
      released: false,
      subscription: None,
    }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.queue.len() }

  #[inline]
  pub(crate) fn kind_at(&self, depth: usize) -> Option<NotificationKind> { self.queue.kind_at(depth) }

  #[inline]
  pub(crate) fn clear(&mut self) { self.queue.clear() }

  pub(crate) fn queue_mut<T, Err>(&mut self) -> Option<&mut VecDeque<Notification<T, Err>>>
  where
    T: 'static,
    Err: 'static,
  {
    self
      .queue
      .as_any_mut()
      .downcast_mut::<JoinQueue<T, Err>>()
      .map(|q| &mut q.entries)
  }

  /// Dequeues the front value. `None` when the queue is empty, holds a
  /// terminal entry at the front, or is not a queue of `T`.
  pub(crate) fn pop_value<T: 'static, Err: 'static>(&mut self) -> Option<T> {
    let queue = self.queue_mut::<T, Err>()?;
    match queue.front() {
      Some(Notification::Next(_)) => queue.pop_front().and_then(Notification::into_value),
      _ => None,
    }
  }
}

/// Starts the subscription of one registered source once the coordinator
/// exists.
pub(crate) type Starter<R, Err> = Box<dyn FnOnce(Arc<WhenCore<R, Err>>, usize) -> BoxedSubscription>;

/// Deduplicates the sources of all plans of a `when`: each distinct source
/// gets one slot, one queue and, later, one subscription.
pub(crate) struct JoinRegistry<R, Err> {
  index: HashMap<SourceId, usize>,
  slots: Vec<Slot>,
  starters: Vec<Starter<R, Err>>,
}

impl<R, Err> JoinRegistry<R, Err> {
  pub(crate) fn new() -> Self { JoinRegistry { index: HashMap::new(), slots: vec![], starters: vec![] } }

  /// The slot of `source`, registering it on first sight.
  pub(crate) fn slot_for<T>(&mut self, source: &BoxedObservable<T, Err>) -> usize
  where
    T: Send + 'static,
    Err: Send + 'static,
    R: 'static,
  {
    let id = source.source_id();
    if let Some(slot) = self.index.get(&id) {
      return *slot;
    }
    let slot = self.slots.len();
    self.index.insert(id, slot);
    self.slots.push(Slot::new::<T, Err>());
    let source = source.clone();
    self.starters.push(Box::new(move |core: Arc<WhenCore<R, Err>>, slot: usize| -> BoxedSubscription {
      Box::new(source.actual_subscribe(JoinObserver::<T, Err, R>::new(core, slot)))
    }));
    slot
  }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.slots.len() }

  pub(crate) fn into_parts(self) -> (Vec<Slot>, Vec<Starter<R, Err>>) { (self.slots, self.starters) }
}

/// The observer subscribed to one distinct source of a `when`. Everything it
/// receives goes straight to the coordinator, tagged with its slot.
pub(crate) struct JoinObserver<T, Err, R> {
  core: Arc<WhenCore<R, Err>>,
  slot: usize,
  _item: std::marker::PhantomData<fn(T)>,
}

impl<T, Err, R> JoinObserver<T, Err, R> {
  fn new(core: Arc<WhenCore<R, Err>>, slot: usize) -> Self {
    JoinObserver { core, slot, _item: std::marker::PhantomData }
  }
}

impl<T, Err, R> Observer<T, Err> for JoinObserver<T, Err, R>
where
  T: Send + 'static,
  Err: Send + 'static,
  R: 'static,
{
  #[inline]
  fn next(&mut self, value: T) { self.core.enqueue(self.slot, Notification::<T, Err>::Next(value)); }

  #[inline]
  fn error(&mut self, err: Err) { self.core.source_error(self.slot, err); }

  #[inline]
  fn complete(&mut self) { self.core.enqueue(self.slot, Notification::<T, Err>::Complete); }

  #[inline]
  fn is_finished(&self) -> bool { self.core.is_terminated() }
}
