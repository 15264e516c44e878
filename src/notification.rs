//! Materialized observer events.

use crate::observer::Observer;

/// One event of an observable sequence: a value, an error or the completion
/// signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<Item, Err> {
  Next(Item),
  Error(Err),
  Complete,
}

/// The variant of a [`Notification`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
  Next,
  Error,
  Complete,
}

impl<Item, Err> Notification<Item, Err> {
  #[inline]
  pub fn kind(&self) -> NotificationKind {
    match self {
      Notification::Next(_) => NotificationKind::Next,
      Notification::Error(_) => NotificationKind::Error,
      Notification::Complete => NotificationKind::Complete,
    }
  }

  /// `true` for `Error` and `Complete`, after which a sequence emits nothing.
  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Notification::Next(_)) }

  /// Returns the carried value of a `Next` notification.
  pub fn into_value(self) -> Option<Item> {
    match self {
      Notification::Next(v) => Some(v),
      _ => None,
    }
  }

  /// Replays this notification into `observer`.
  pub fn accept<O>(self, observer: &mut O)
  where
    O: Observer<Item, Err> + ?Sized,
  {
    match self {
      Notification::Next(v) => observer.next(v),
      Notification::Error(err) => observer.error(err),
      Notification::Complete => observer.complete(),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[derive(Default)]
  struct Record {
    values: Vec<i32>,
    errors: Vec<&'static str>,
    completed: usize,
  }

  impl Observer<i32, &'static str> for Record {
    fn next(&mut self, value: i32) { self.values.push(value); }
    fn error(&mut self, err: &'static str) { self.errors.push(err); }
    fn complete(&mut self) { self.completed += 1; }
    fn is_finished(&self) -> bool { false }
  }

  #[test]
  fn accept_dispatches_by_kind() {
    let mut record = Record::default();
    Notification::Next(1).accept(&mut record);
    Notification::Error("boom").accept(&mut record);
    Notification::<i32, &str>::Complete.accept(&mut record);

    assert_eq!(record.values, vec![1]);
    assert_eq!(record.errors, vec!["boom"]);
    assert_eq!(record.completed, 1);
  }

  #[test]
  fn terminal_kinds() {
    assert!(!Notification::<_, ()>::Next(1).is_terminal());
    assert!(Notification::<i32, _>::Error(()).is_terminal());
    assert!(Notification::<i32, ()>::Complete.is_terminal());
    assert_eq!(Notification::<i32, ()>::Complete.kind(), NotificationKind::Complete);
    assert_eq!(Notification::<_, ()>::Next(7).into_value(), Some(7));
  }
}
