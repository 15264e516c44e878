use crate::{
  observable::Observable,
  observer::Observer,
  subject::SubjectLike,
  subscription::SharedSubscription,
};

/// Per-subscription multicasting: every subscriber gets a private subject,
/// sees the observable `selector` builds on it, and the source feeds that
/// subject directly. Inside `selector` the subject may be subscribed any
/// number of times while the source is subscribed once.
///
/// # Example
///
/// ```
/// use rxjoin::prelude::*;
///
/// // Pair consecutive values through a single subscription of the source.
/// observable::from_iter::<_, ()>(0..4)
///   .multicast_selector(Subject::new, |s: Subject<i32, ()>| {
///     when([s.clone().and(s).then(|a, b| (a, b))])
///   })
///   .subscribe(|pair| println!("{:?}", pair));
/// ```
#[derive(Clone)]
pub struct MulticastSelector<Source, F, Sel> {
  source: Source,
  factory: F,
  selector: Sel,
}

impl<Source, F, Sel> MulticastSelector<Source, F, Sel> {
  #[inline]
  pub(crate) fn new(source: Source, factory: F, selector: Sel) -> Self {
    MulticastSelector { source, factory, selector }
  }
}

impl<Source, F, Sel, Sub, Out> Observable for MulticastSelector<Source, F, Sel>
where
  Source: Observable,
  Sub: SubjectLike<Source::Item, Source::Err>,
  F: Fn() -> Sub,
  Sel: Fn(Sub) -> Out,
  Out: Observable<Err = Source::Err>,
{
  type Item = Out::Item;
  type Err = Source::Err;
  type Unsub = SharedSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let subject = (self.factory)();
    let subscription = SharedSubscription::default();
    subscription.add((self.selector)(subject.clone()).actual_subscribe(observer));
    subscription.add(self.source.actual_subscribe(subject));
    subscription
  }
}
