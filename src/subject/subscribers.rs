use crate::observer::Observer;
use smallvec::SmallVec;

/// The observers of a subject, keyed by the id their subscription carries.
///
/// Broadcasting clones the value for every observer but the last one, which
/// receives the moved value.
pub(crate) struct Subscribers<Ob> {
  items: SmallVec<[(usize, Ob); 2]>,
}

impl<Ob> Default for Subscribers<Ob> {
  fn default() -> Self { Subscribers { items: SmallVec::new() } }
}

impl<Ob> Subscribers<Ob> {
  #[inline]
  pub(crate) fn insert(&mut self, id: usize, observer: Ob) { self.items.push((id, observer)); }

  pub(crate) fn remove(&mut self, id: usize) -> Option<Ob> {
    let pos = self.items.iter().position(|(i, _)| *i == id)?;
    Some(self.items.remove(pos).1)
  }

  #[inline]
  pub(crate) fn contains(&self, id: usize) -> bool { self.items.iter().any(|(i, _)| *i == id) }

  pub(crate) fn ids(&self) -> impl Iterator<Item = usize> + '_ { self.items.iter().map(|(id, _)| *id) }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Moves every observer of `other` to the end of `self`.
  pub(crate) fn append(&mut self, other: &mut Self) { self.items.extend(other.items.drain(..)); }

  /// Removes the observers `is_done` rejects and returns them, so the caller
  /// chooses where they are dropped.
  pub(crate) fn drain_where(&mut self, mut is_done: impl FnMut(&Ob) -> bool) -> Vec<Ob> {
    let mut done = vec![];
    let mut idx = 0;
    while idx < self.items.len() {
      if is_done(&self.items[idx].1) {
        done.push(self.items.remove(idx).1);
      } else {
        idx += 1;
      }
    }
    done
  }

  pub(crate) fn broadcast_value<Item, Err>(&mut self, value: Item)
  where
    Ob: Observer<Item, Err>,
    Item: Clone,
  {
    let mut iter = self.items.iter_mut().peekable();
    while let Some((_, observer)) = iter.next() {
      if iter.peek().is_some() {
        observer.next(value.clone());
      } else {
        observer.next(value);
        break;
      }
    }
  }

  /// Sends `err` to every observer and empties the list.
  pub(crate) fn broadcast_error<Item, Err>(&mut self, err: Err)
  where
    Ob: Observer<Item, Err>,
    Err: Clone,
  {
    let mut iter = self.items.drain(..).peekable();
    while let Some((_, mut observer)) = iter.next() {
      if iter.peek().is_some() {
        observer.error(err.clone());
      } else {
        observer.error(err);
        break;
      }
    }
  }

  /// Completes every observer and empties the list.
  pub(crate) fn broadcast_complete<Item, Err>(&mut self)
  where
    Ob: Observer<Item, Err>,
  {
    for (_, mut observer) in self.items.drain(..) {
      observer.complete();
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::observer::{BoxedObserver, ObserverAll};
  use std::sync::{Arc, Mutex};

  fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> BoxedObserver<i32, String> {
    let (l_next, l_err, l_complete) = (log.clone(), log.clone(), log.clone());
    Box::new(ObserverAll::new(
      move |v: i32| l_next.lock().unwrap().push(format!("{}:{}", name, v)),
      move |e: String| l_err.lock().unwrap().push(format!("{}:{}", name, e)),
      move || l_complete.lock().unwrap().push(format!("{}:done", name)),
    ))
  }

  #[test]
  fn broadcast_in_insertion_order() {
    let log = Arc::new(Mutex::new(vec![]));
    let mut subscribers = Subscribers::default();
    subscribers.insert(0, recorder(&log, "a"));
    subscribers.insert(1, recorder(&log, "b"));

    subscribers.broadcast_value::<_, String>(1);
    assert!(subscribers.remove(0).is_some());
    subscribers.broadcast_value::<_, String>(2);
    subscribers.broadcast_complete::<i32, String>();

    assert!(subscribers.is_empty());
    assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1", "b:2", "b:done"]);
  }

  #[test]
  fn error_drains() {
    let log = Arc::new(Mutex::new(vec![]));
    let mut subscribers = Subscribers::default();
    subscribers.insert(3, recorder(&log, "a"));
    subscribers.insert(7, recorder(&log, "b"));
    assert!(subscribers.contains(7));

    subscribers.broadcast_error::<i32, _>("boom".to_string());
    assert_eq!(subscribers.len(), 0);
    assert_eq!(*log.lock().unwrap(), vec!["a:boom", "b:boom"]);
  }
}
