//! The `Observable` trait and its extension methods.
//!
//! An observable is a lazy push source: nothing happens until an observer is
//! handed to [`Observable::actual_subscribe`]. [`ObservableExt`] layers the
//! user-facing API on top: closure subscriptions, boxing, join patterns and
//! the multicast family.

use crate::{
  join::{pattern::Pattern, plan::Plan},
  observer::{Observer, ObserverAll},
  ops::{multicast::MulticastSelector, ref_count::RefCount},
  subject::{BehaviorSubject, ReplaySubject, Subject, SubjectLike},
  subscription::{SubscriptionLike, SubscriptionWrapper},
};

pub mod boxed;
pub mod connectable_observable;
pub mod create;
pub mod from_iter;
pub mod trivial;

pub use boxed::*;
pub use connectable_observable::*;
pub use create::*;
pub use from_iter::*;
pub use trivial::*;

/// A representation of any set of values over any amount of time. This is the
/// most basic building block of the crate.
pub trait Observable: Sized {
  type Item;
  type Err;
  type Unsub: SubscriptionLike + Send + 'static;

  /// Attaches `observer` and starts the production. The returned handle stops
  /// it.
  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static;

  /// Erases the type of this observable.
  ///
  /// The returned [`BoxedObservable`] carries a [`SourceId`]: all its clones
  /// share it, which is what lets join plans recognise one source used in
  /// several places. Sources with an identity of their own (subjects, boxed
  /// observables) keep it.
  fn into_boxed(self) -> BoxedObservable<Self::Item, Self::Err>
  where
    Self: Clone + Send + Sync + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    BoxedObservable::new(self)
  }
}

pub trait ObservableExt: Observable {
  /// Invokes `next` for every value. Errors and completion are ignored.
  fn subscribe<N>(self, next: N) -> SubscriptionWrapper<Self::Unsub>
  where
    N: FnMut(Self::Item) + Send + 'static,
  {
    self.subscribe_all(next, |_| {}, || {})
  }

  fn subscribe_err<N, E>(self, next: N, error: E) -> SubscriptionWrapper<Self::Unsub>
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(Self::Err) + Send + 'static,
  {
    self.subscribe_all(next, error, || {})
  }

  fn subscribe_complete<N, C>(self, next: N, complete: C) -> SubscriptionWrapper<Self::Unsub>
  where
    N: FnMut(Self::Item) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_all(next, |_| {}, complete)
  }

  fn subscribe_all<N, E, C>(self, next: N, error: E, complete: C) -> SubscriptionWrapper<Self::Unsub>
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(Self::Err) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    SubscriptionWrapper(self.actual_subscribe(ObserverAll::new(next, error, complete)))
  }

  /// Alias of [`Observable::into_boxed`].
  #[inline]
  fn box_it(self) -> BoxedObservable<Self::Item, Self::Err>
  where
    Self: Clone + Send + Sync + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    self.into_boxed()
  }

  /// Starts a join pattern: values of `self` and `other` are combined only
  /// when both have at least one pending value.
  fn and<S>(self, other: S) -> Pattern<(BoxedObservable<Self::Item, Self::Err>, BoxedObservable<S::Item, Self::Err>)>
  where
    Self: Clone + Send + Sync + 'static,
    S: Observable<Err = Self::Err> + Clone + Send + Sync + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
    S::Item: 'static,
  {
    Pattern::new((self.into_boxed(), other.into_boxed()))
  }

  /// A single-operand join plan mapping every value through `selector`.
  fn then<R, F>(self, selector: F) -> Plan<R, Self::Err>
  where
    Self: Clone + Send + Sync + 'static,
    Self::Item: Send + 'static,
    Self::Err: Send + 'static,
    R: 'static,
    F: FnMut(Self::Item) -> R + Clone + Send + 'static,
  {
    Pattern::new((self.into_boxed(),)).then(selector)
  }

  /// Like [`ObservableExt::then`], with a selector that may fail; an `Err`
  /// terminates the whole `when` it belongs to.
  fn then_try<R, F>(self, selector: F) -> Plan<R, Self::Err>
  where
    Self: Clone + Send + Sync + 'static,
    Self::Item: Send + 'static,
    Self::Err: Send + 'static,
    R: 'static,
    F: FnMut(Self::Item) -> Result<R, Self::Err> + Clone + Send + 'static,
  {
    Pattern::new((self.into_boxed(),)).then_try(selector)
  }

  /// Shares one subscription of `self` through `subject`. Nothing is
  /// subscribed upstream until [`ConnectableObservable::connect`].
  fn multicast<Sub>(self, subject: Sub) -> ConnectableObservable<Self, Sub>
  where
    Self: Clone,
    Sub: SubjectLike<Self::Item, Self::Err>,
  {
    ConnectableObservable::new(self, subject)
  }

  /// Like [`ObservableExt::multicast`], but a new subject is created by
  /// `factory` whenever the current one has terminated.
  fn multicast_factory<Sub, F>(self, factory: F) -> ConnectableObservable<Self, Sub>
  where
    Self: Clone,
    Sub: SubjectLike<Self::Item, Self::Err>,
    F: Fn() -> Sub + Send + Sync + 'static,
  {
    ConnectableObservable::with_factory(self, factory)
  }

  /// Every subscription gets its own subject from `factory`; the observer
  /// sees `selector(subject)` while `self` feeds the subject.
  fn multicast_selector<Sub, F, Sel, Out>(
    self, factory: F, selector: Sel,
  ) -> MulticastSelector<Self, F, Sel>
  where
    Sub: SubjectLike<Self::Item, Self::Err>,
    F: Fn() -> Sub,
    Sel: Fn(Sub) -> Out,
    Out: Observable<Err = Self::Err>,
  {
    MulticastSelector::new(self, factory, selector)
  }

  fn publish(self) -> ConnectableObservable<Self, Subject<Self::Item, Self::Err>>
  where
    Self: Clone,
    Subject<Self::Item, Self::Err>: SubjectLike<Self::Item, Self::Err>,
  {
    self.multicast(Subject::new())
  }

  /// Multicasts through a [`ReplaySubject`] keeping the last `buffer` values
  /// (all of them with `None`).
  fn replay(
    self, buffer: Option<usize>,
  ) -> ConnectableObservable<Self, ReplaySubject<Self::Item, Self::Err>>
  where
    Self: Clone,
    ReplaySubject<Self::Item, Self::Err>: SubjectLike<Self::Item, Self::Err>,
  {
    self.multicast(ReplaySubject::new(buffer))
  }

  fn publish_behavior(
    self, initial: Self::Item,
  ) -> ConnectableObservable<Self, BehaviorSubject<Self::Item, Self::Err>>
  where
    Self: Clone,
    BehaviorSubject<Self::Item, Self::Err>: SubjectLike<Self::Item, Self::Err>,
  {
    self.multicast(BehaviorSubject::new(initial))
  }

  /// `publish` with a subject per connection cycle, reference counted.
  fn share(self) -> RefCount<Self, Subject<Self::Item, Self::Err>>
  where
    Self: Clone + Send + Sync + 'static,
    Subject<Self::Item, Self::Err>: SubjectLike<Self::Item, Self::Err>,
  {
    self.multicast_factory(Subject::new).ref_count()
  }

  fn share_replay(self, buffer: Option<usize>) -> RefCount<Self, ReplaySubject<Self::Item, Self::Err>>
  where
    Self: Clone + Send + Sync + 'static,
    ReplaySubject<Self::Item, Self::Err>: SubjectLike<Self::Item, Self::Err>,
  {
    self.replay(buffer).ref_count()
  }
}

impl<T: Observable> ObservableExt for T {}
