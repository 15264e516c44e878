use super::{join_observer::Slot, pattern::JoinOperands};
use crate::notification::NotificationKind;
use smallvec::SmallVec;
use std::{cell::RefCell, marker::PhantomData};

/// Where a plan stands against the current queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
  /// Some operand has no entry to offer yet.
  NotReady,
  /// Every operand has a value at the front: the plan can fire.
  Ready,
  /// Every operand has an entry and one of them is a completion: the plan
  /// can never fire again.
  Exhausted,
}

/// One plan of a running `when`, bound to the slots of its operands.
pub(crate) trait ActivePlan<R, Err>: Send {
  /// Slot of every operand, in declaration order. A source used twice
  /// appears twice.
  fn slots(&self) -> &[usize];

  fn readiness(&self, slots: &[Slot]) -> Readiness;

  /// Dequeues one entry per operand and calls the selector with the values.
  /// `None` if the queues did not hold what `readiness` promised.
  fn fire(&mut self, slots: &RefCell<Vec<Slot>>) -> Option<Result<R, Err>>;
}

/// Readiness of a plan reading `operands`. The k-th occurrence of a slot
/// looks k entries deep into its queue. A completion is always the last
/// entry of a queue, so it also answers every occurrence reading past it.
pub(crate) fn readiness_of(operands: &[usize], slots: &[Slot]) -> Readiness {
  let mut exhausted = false;
  for (pos, slot) in operands.iter().enumerate() {
    let depth = operands[..pos].iter().filter(|s| *s == slot).count();
    let queue = &slots[*slot];
    let kind = match queue.kind_at(depth) {
      Some(kind) => Some(kind),
      None => queue.len().checked_sub(1).and_then(|last| queue.kind_at(last)),
    };
    match kind {
      Some(NotificationKind::Complete) => exhausted = true,
      Some(_) if depth < queue.len() => {}
      _ => return Readiness::NotReady,
    }
  }
  if exhausted { Readiness::Exhausted } else { Readiness::Ready }
}

/// Slots of `operands` without repetitions, first occurrence first.
pub(crate) fn distinct(operands: &[usize]) -> SmallVec<[usize; 4]> {
  let mut slots = SmallVec::new();
  for slot in operands {
    if !slots.contains(slot) {
      slots.push(*slot);
    }
  }
  slots
}

pub(crate) struct JoinPlan<Ops, G> {
  slots: SmallVec<[usize; 4]>,
  selector: G,
  _operands: PhantomData<fn() -> Ops>,
}

impl<Ops, G> JoinPlan<Ops, G> {
  pub(crate) fn new(slots: SmallVec<[usize; 4]>, selector: G) -> Self {
    JoinPlan { slots, selector, _operands: PhantomData }
  }
}

impl<R, Err, Ops, G> ActivePlan<R, Err> for JoinPlan<Ops, G>
where
  Ops: JoinOperands<Err>,
  G: FnMut(Ops::Values) -> Result<R, Err> + Send,
{
  #[inline]
  fn slots(&self) -> &[usize] { &self.slots }

  #[inline]
  fn readiness(&self, slots: &[Slot]) -> Readiness { readiness_of(&self.slots, slots) }

  fn fire(&mut self, slots: &RefCell<Vec<Slot>>) -> Option<Result<R, Err>> {
    // The table borrow ends before the selector runs: it may emit into one of
    // the joined sources.
    let values = Ops::dequeue(&self.slots, &mut slots.borrow_mut())?;
    Some((self.selector)(values))
  }
}
