use super::{
  active_plan::{ActivePlan, JoinPlan},
  join_observer::JoinRegistry,
  pattern::JoinOperands,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// A pattern bound to its selector, ready to be passed to
/// [`when`](crate::join::when()).
///
/// Plans are descriptions: every subscription of the `when` activates them
/// afresh, with a clone of the selector.
pub struct Plan<R, Err> {
  def: Arc<dyn PlanDef<R, Err>>,
}

impl<R, Err> Clone for Plan<R, Err> {
  fn clone(&self) -> Self { Plan { def: self.def.clone() } }
}

pub(crate) trait PlanDef<R, Err>: Send + Sync {
  fn activate(&self, registry: &mut JoinRegistry<R, Err>) -> Box<dyn ActivePlan<R, Err>>;

  fn arity(&self) -> usize;
}

struct PlanSpec<Ops, G> {
  operands: Ops,
  arity: usize,
  selector: Mutex<G>,
}

impl<R, Err, Ops, G> PlanDef<R, Err> for PlanSpec<Ops, G>
where
  Ops: JoinOperands<Err> + Send + Sync + 'static,
  G: FnMut(Ops::Values) -> Result<R, Err> + Clone + Send + 'static,
  R: 'static,
  Err: Send + 'static,
{
  fn activate(&self, registry: &mut JoinRegistry<R, Err>) -> Box<dyn ActivePlan<R, Err>> {
    let slots = self.operands.register(registry);
    let selector = self.selector.lock().clone();
    Box::new(JoinPlan::<Ops, G>::new(slots, selector))
  }

  #[inline]
  fn arity(&self) -> usize { self.arity }
}

impl<R, Err> Plan<R, Err> {
  pub(crate) fn new<Ops, G>(operands: Ops, arity: usize, selector: G) -> Self
  where
    Ops: JoinOperands<Err> + Send + Sync + 'static,
    G: FnMut(Ops::Values) -> Result<R, Err> + Clone + Send + 'static,
    R: 'static,
    Err: Send + 'static,
  {
    Plan { def: Arc::new(PlanSpec { operands, arity, selector: Mutex::new(selector) }) }
  }

  /// Registers the operands in `registry` and binds the selector to the
  /// slots they got.
  #[inline]
  pub(crate) fn activate(&self, registry: &mut JoinRegistry<R, Err>) -> Box<dyn ActivePlan<R, Err>> {
    self.def.activate(registry)
  }

  /// Number of operands.
  #[inline]
  pub fn arity(&self) -> usize { self.def.arity() }
}
