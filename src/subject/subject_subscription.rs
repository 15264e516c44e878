use super::SubjectCore;
use crate::subscription::SubscriptionLike;
use std::sync::Weak;

/// The handle returned when subscribing to a subject. Unsubscribing removes
/// the observer from the subject; during a broadcast the removal is deferred
/// until the broadcast is over.
pub struct SubjectSubscription<Item, Err> {
  core: Weak<SubjectCore<Item, Err>>,
  id: usize,
  closed: bool,
}

impl<Item, Err> SubjectSubscription<Item, Err> {
  pub(crate) fn new(core: Weak<SubjectCore<Item, Err>>, id: usize) -> Self {
    SubjectSubscription { core, id, closed: false }
  }

  /// A subscription of an observer the subject already let go of.
  pub(crate) fn closed() -> Self { SubjectSubscription { core: Weak::new(), id: 0, closed: true } }
}

impl<Item, Err> SubscriptionLike for SubjectSubscription<Item, Err> {
  fn unsubscribe(&mut self) {
    if self.closed {
      return;
    }
    self.closed = true;
    if let Some(core) = self.core.upgrade() {
      let removed = core.remove_observer(self.id);
      drop(removed);
    }
  }

  fn is_closed(&self) -> bool {
    self.closed || self.core.upgrade().map_or(true, |core| !core.is_subscribed(self.id))
  }
}
