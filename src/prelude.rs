//! Everything needed to build and join streams with a single import.

pub use crate::{
  error::JoinError,
  join::{when, JoinConfig, Pattern, Plan, When, WhenSubscription},
  notification::{Notification, NotificationKind},
  observable::{
    self, BoxedObservable, ConnectableObservable, Connection, Observable, ObservableExt, SourceId,
  },
  observer::{BoxedObserver, Observer, ObserverAll},
  ops::{multicast::MulticastSelector, ref_count::RefCount},
  subject::{BehaviorSubject, ReplaySubject, Subject, SubjectLike, SubjectSubscription},
  subscriber::Subscriber,
  subscription::{
    BoxedSubscription, ClosureSubscription, SharedSubscription, SubscriptionGuard, SubscriptionLike,
    SubscriptionWrapper,
  },
};
