use crate::{
  observable::Observable,
  observer::{BoxedObserver, Observer},
  subscription::BoxedSubscription,
};
use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

/// Identity of an observable source.
///
/// Two observables with the same id are the same source: a join `when`
/// subscribes it once and every plan using it reads from the same queue.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SourceId(usize);

impl SourceId {
  /// The id of whatever `shared` points at.
  pub fn of<T: ?Sized>(shared: &Arc<T>) -> Self { SourceId(Arc::as_ptr(shared) as *const () as usize) }
}

trait DynObservable<Item, Err>: Send + Sync {
  fn box_subscribe(&self, observer: BoxedObserver<Item, Err>) -> BoxedSubscription;
}

impl<S> DynObservable<S::Item, S::Err> for S
where
  S: Observable + Clone + Send + Sync,
  S::Item: 'static,
  S::Err: 'static,
{
  fn box_subscribe(&self, observer: BoxedObserver<S::Item, S::Err>) -> BoxedSubscription {
    Box::new(self.clone().actual_subscribe(observer))
  }
}

/// A type-erased, cloneable observable.
pub struct BoxedObservable<Item, Err> {
  source: Arc<dyn DynObservable<Item, Err>>,
  id: SourceId,
}

impl<Item, Err> BoxedObservable<Item, Err> {
  pub fn new<S>(source: S) -> Self
  where
    S: Observable<Item = Item, Err = Err> + Clone + Send + Sync + 'static,
    Item: 'static,
    Err: 'static,
  {
    let source: Arc<dyn DynObservable<Item, Err>> = Arc::new(source);
    let id = SourceId::of(&source);
    BoxedObservable { source, id }
  }

  /// Boxes `source` under an identity chosen by the caller, used by sources
  /// that are handles over shared state.
  pub(crate) fn with_id<S>(source: S, id: SourceId) -> Self
  where
    S: Observable<Item = Item, Err = Err> + Clone + Send + Sync + 'static,
    Item: 'static,
    Err: 'static,
  {
    BoxedObservable { source: Arc::new(source), id }
  }

  #[inline]
  pub fn source_id(&self) -> SourceId { self.id }
}

impl<Item, Err> Clone for BoxedObservable<Item, Err> {
  fn clone(&self) -> Self { BoxedObservable { source: self.source.clone(), id: self.id } }
}

impl<Item, Err> Debug for BoxedObservable<Item, Err> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BoxedObservable").field("id", &self.id).finish()
  }
}

impl<Item: 'static, Err: 'static> Observable for BoxedObservable<Item, Err> {
  type Item = Item;
  type Err = Err;
  type Unsub = BoxedSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    self.source.box_subscribe(Box::new(observer))
  }

  #[inline]
  fn into_boxed(self) -> BoxedObservable<Item, Err> { self }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::sync::{Arc, Mutex};

  #[test]
  fn boxing_keeps_identity() {
    let boxed = observable::from_iter::<_, ()>(vec![1, 2, 3]).box_it();
    let same = boxed.clone().box_it();
    let other = observable::from_iter::<_, ()>(vec![1, 2, 3]).box_it();

    assert_eq!(boxed.source_id(), same.source_id());
    assert_ne!(boxed.source_id(), other.source_id());
  }

  #[test]
  fn boxed_subscribe() {
    let values = Arc::new(Mutex::new(vec![]));
    let c_values = values.clone();
    observable::from_iter::<_, ()>(0..3)
      .box_it()
      .subscribe(move |v| c_values.lock().unwrap().push(v));

    assert_eq!(*values.lock().unwrap(), vec![0, 1, 2]);
  }
}
