//! Join patterns: conjunctions of sources that fire together.
//!
//! `a.and(b).and(c)` builds a [`Pattern`] over three sources; `then` binds a
//! selector to it and yields a [`Plan`]. A pattern matches when every
//! operand has at least one value queued, and consumes exactly one value
//! per operand each time.
//!
//! Patterns hold up to 16 operands.

use super::{
  join_observer::{JoinRegistry, Slot},
  plan::Plan,
};
use crate::observable::{BoxedObservable, Observable};
use smallvec::SmallVec;

/// A conjunction of boxed sources. See the [module docs](self).
pub struct Pattern<Ops> {
  operands: Ops,
}

impl<Ops> Pattern<Ops> {
  #[inline]
  pub(crate) fn new(operands: Ops) -> Self { Pattern { operands } }
}

impl<Ops: Clone> Clone for Pattern<Ops> {
  fn clone(&self) -> Self { Pattern { operands: self.operands.clone() } }
}

/// A tuple of boxed sources usable as the operands of a plan.
pub(crate) trait JoinOperands<Err> {
  /// The tuple of values a match hands to the selector.
  type Values;

  /// Registers every operand, returning their slots in declaration order.
  fn register<R: 'static>(&self, registry: &mut JoinRegistry<R, Err>) -> SmallVec<[usize; 4]>;

  /// Pops one value per operand. Slots must be ready for the plan.
  fn dequeue(slots: &[usize], table: &mut [Slot]) -> Option<Self::Values>;
}

macro_rules! impl_pattern {
  ($($T:ident $v:ident $idx:tt),+) => {
    impl<Err, $($T),+> JoinOperands<Err> for ($(BoxedObservable<$T, Err>,)+)
    where
      Err: Send + 'static,
      $($T: Send + 'static,)+
    {
      type Values = ($($T,)+);

      fn register<R: 'static>(&self, registry: &mut JoinRegistry<R, Err>) -> SmallVec<[usize; 4]> {
        let mut slots = SmallVec::new();
        $(slots.push(registry.slot_for(&self.$idx));)+
        slots
      }

      fn dequeue(slots: &[usize], table: &mut [Slot]) -> Option<Self::Values> {
        let mut operand = slots.iter();
        Some(($(table[*operand.next()?].pop_value::<$T, Err>()?,)+))
      }
    }

    impl<Err, $($T),+> Pattern<($(BoxedObservable<$T, Err>,)+)>
    where
      Err: Send + 'static,
      $($T: Send + 'static,)+
    {
      /// Binds `selector` to this pattern. It receives one value of every
      /// operand, in declaration order.
      pub fn then<R, F>(self, mut selector: F) -> Plan<R, Err>
      where
        R: 'static,
        F: FnMut($($T),+) -> R + Clone + Send + 'static,
      {
        let arity = [$($idx),+].len();
        Plan::new(self.operands, arity, move |($($v,)+)| Ok(selector($($v),+)))
      }

      /// Like [`then`](Self::then), with a selector that may fail. An `Err`
      /// terminates the whole `when` the plan belongs to.
      pub fn then_try<R, F>(self, mut selector: F) -> Plan<R, Err>
      where
        R: 'static,
        F: FnMut($($T),+) -> Result<R, Err> + Clone + Send + 'static,
      {
        let arity = [$($idx),+].len();
        Plan::new(self.operands, arity, move |($($v,)+)| selector($($v),+))
      }
    }
  };
}

macro_rules! impl_pattern_and {
  ($($T:ident $idx:tt),+) => {
    impl<Err, $($T),+> Pattern<($(BoxedObservable<$T, Err>,)+)> {
      /// Adds `other` as the next operand.
      pub fn and<S>(self, other: S) -> Pattern<($(BoxedObservable<$T, Err>,)+ BoxedObservable<S::Item, Err>)>
      where
        S: Observable<Err = Err> + Clone + Send + Sync + 'static,
        S::Item: 'static,
        Err: 'static,
      {
        let operands = self.operands;
        Pattern::new(($(operands.$idx,)+ other.into_boxed()))
      }
    }
  };
}

impl_pattern!(T0 v0 0);
impl_pattern!(T0 v0 0, T1 v1 1);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8, T9 v9 9);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8, T9 v9 9, T10 v10 10);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8, T9 v9 9, T10 v10 10, T11 v11 11);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8, T9 v9 9, T10 v10 10, T11 v11 11, T12 v12 12);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8, T9 v9 9, T10 v10 10, T11 v11 11, T12 v12 12, T13 v13 13);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8, T9 v9 9, T10 v10 10, T11 v11 11, T12 v12 12, T13 v13 13, T14 v14 14);
impl_pattern!(T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8, T9 v9 9, T10 v10 10, T11 v11 11, T12 v12 12, T13 v13 13, T14 v14 14, T15 v15 15);

impl_pattern_and!(T0 0);
impl_pattern_and!(T0 0, T1 1);
impl_pattern_and!(T0 0, T1 1, T2 2);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9, T10 10);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9, T10 10, T11 11);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9, T10 10, T11 11, T12 12);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9, T10 10, T11 11, T12 12, T13 13);
impl_pattern_and!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9, T10 10, T11 11, T12 12, T13 13, T14 14);

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn arity_follows_and_chain() {
    let a = Subject::<i32, ()>::new();
    let b = Subject::<&'static str, ()>::new();
    let c = Subject::<bool, ()>::new();

    assert_eq!(a.clone().then(|v| v).arity(), 1);
    assert_eq!(a.clone().and(b.clone()).then(|v, s| (v, s)).arity(), 2);
    assert_eq!(a.and(b).and(c).then_try(|v, s, f| Ok((v, s, f))).arity(), 3);
  }
}
