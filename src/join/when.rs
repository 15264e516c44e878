use super::{
  active_plan::{distinct, ActivePlan, Readiness},
  config::JoinConfig,
  join_observer::{JoinRegistry, Slot},
  plan::Plan,
};
use crate::{
  error::JoinError,
  notification::Notification,
  observable::Observable,
  observer::{BoxedObserver, Observer},
  subscription::{BoxedSubscription, SharedSubscription, SubscriptionLike},
};
use parking_lot::ReentrantMutex;
use std::{
  cell::{Cell, RefCell},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};
use tracing::{debug, error, trace, warn};

/// Joins the sources of several plans and emits what their selectors
/// return.
///
/// Every distinct source is subscribed once, however many plans use it, and
/// its values are queued until a plan consumes them. The `when` completes
/// once every plan is exhausted and errors as soon as a source or a selector
/// does.
///
/// # Example
///
/// ```
/// use rxjoin::prelude::*;
///
/// let mut prices = Subject::<f64, ()>::new();
/// let mut orders = Subject::<u32, ()>::new();
///
/// when([prices.clone().and(orders.clone()).then(|p, q| p * q as f64)])
///   .subscribe(|total| println!("total: {}", total));
///
/// prices.next(2.5);
/// orders.next(4);
/// ```
pub fn when<R, Err, I>(plans: I) -> When<R, Err>
where
  I: IntoIterator<Item = Plan<R, Err>>,
{
  When::new(plans)
}

/// The observable built by [`when`].
pub struct When<R, Err> {
  plans: Vec<Plan<R, Err>>,
  config: JoinConfig,
  overflow: Option<fn(JoinError) -> Err>,
}

impl<R, Err> Clone for When<R, Err> {
  fn clone(&self) -> Self { When { plans: self.plans.clone(), config: self.config, overflow: self.overflow } }
}

impl<R, Err> When<R, Err> {
  pub fn new<I>(plans: I) -> Self
  where
    I: IntoIterator<Item = Plan<R, Err>>,
  {
    When { plans: plans.into_iter().collect(), config: JoinConfig::default(), overflow: None }
  }

  /// Applies `config`. Engine failures it can cause are reported through the
  /// stream, hence the `From<JoinError>` requirement.
  pub fn with_config(mut self, config: JoinConfig) -> Self
  where
    Err: From<JoinError>,
  {
    self.config = config;
    self.overflow = Some(Err::from);
    self
  }

  /// Bounds every join queue to `capacity` unmatched values.
  #[inline]
  pub fn queue_capacity(self, capacity: usize) -> Self
  where
    Err: From<JoinError>,
  {
    self.with_config(JoinConfig::bounded(capacity))
  }

  #[inline]
  pub fn config(&self) -> JoinConfig { self.config }
}

impl<R, Err> Observable for When<R, Err>
where
  R: 'static,
  Err: Send + 'static,
{
  type Item = R;
  type Err = Err;
  type Unsub = WhenSubscription<R, Err>;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<R, Err> + Send + 'static,
  {
    let bound = match (self.config.queue_capacity, self.overflow) {
      (Some(capacity), Some(into)) => Some((capacity, into)),
      _ => None,
    };
    let core = Arc::new(WhenCore::new(Box::new(observer), bound));

    let mut registry = JoinRegistry::new();
    let plans: Vec<_> = self.plans.iter().map(|plan| plan.activate(&mut registry)).collect();
    debug!(plans = plans.len(), sources = registry.len(), "when subscribed");

    let (slots, starters) = registry.into_parts();
    core.install(slots, plans);
    for (slot, start) in starters.into_iter().enumerate() {
      if core.is_terminated() {
        break;
      }
      let subscription = start(core.clone(), slot);
      core.attach(slot, subscription);
    }
    WhenSubscription { core }
  }
}

/// The subscription of a [`When`]. Unsubscribing tears the join down and
/// unsubscribes every joined source.
pub struct WhenSubscription<R, Err> {
  core: Arc<WhenCore<R, Err>>,
}

impl<R: 'static, Err: Send + 'static> WhenSubscription<R, Err> {
  /// Number of queued entries per source, in registration order.
  pub fn queue_lengths(&self) -> Vec<usize> { self.core.queue_lengths() }
}

impl<R: 'static, Err: Send + 'static> SubscriptionLike for WhenSubscription<R, Err> {
  #[inline]
  fn unsubscribe(&mut self) { self.core.dispose(); }

  #[inline]
  fn is_closed(&self) -> bool { self.core.is_terminated() }
}

enum Terminal<Err> {
  Complete,
  Error(Err),
  Dispose,
}

struct PlanEntry<R, Err> {
  plan: Box<dyn ActivePlan<R, Err>>,
  active: bool,
}

/// The coordinator of one subscription of a `when`.
///
/// All of its state sits behind `gate`, held while queueing, matching,
/// running selectors and notifying downstream. The gate is re-entrant: a
/// notification raised by a callback of the dispatching thread is queued and
/// left to the running dispatch. No `RefCell` borrow is held across a
/// callback.
pub(crate) struct WhenCore<R, Err> {
  gate: ReentrantMutex<WhenState<R, Err>>,
  terminated: AtomicBool,
  subscription: SharedSubscription,
  bound: Option<(usize, fn(JoinError) -> Err)>,
}

struct WhenState<R, Err> {
  dispatching: Cell<bool>,
  rerun: Cell<bool>,
  slots: RefCell<Vec<Slot>>,
  plans: RefCell<Vec<PlanEntry<R, Err>>>,
  downstream: RefCell<Option<BoxedObserver<R, Err>>>,
  deferred: RefCell<Option<Terminal<Err>>>,
}

/// Lowers the dispatching flag when a dispatch ends, even by unwinding.
struct Dispatching<'a>(&'a Cell<bool>);

impl<'a> Drop for Dispatching<'a> {
  fn drop(&mut self) { self.0.set(false); }
}

impl<R, Err> WhenCore<R, Err>
where
  R: 'static,
  Err: Send + 'static,
{
  fn new(downstream: BoxedObserver<R, Err>, bound: Option<(usize, fn(JoinError) -> Err)>) -> Self {
    WhenCore {
      gate: ReentrantMutex::new(WhenState {
        dispatching: Cell::new(false),
        rerun: Cell::new(false),
        slots: RefCell::new(vec![]),
        plans: RefCell::new(vec![]),
        downstream: RefCell::new(Some(downstream)),
        deferred: RefCell::new(None),
      }),
      terminated: AtomicBool::new(false),
      subscription: SharedSubscription::default(),
      bound,
    }
  }

  #[inline]
  pub(crate) fn is_terminated(&self) -> bool { self.terminated.load(Ordering::Acquire) }

  fn install(&self, mut slots: Vec<Slot>, plans: Vec<Box<dyn ActivePlan<R, Err>>>) {
    let state = self.gate.lock();
    for plan in &plans {
      for slot in distinct(plan.slots()) {
        slots[slot].plans += 1;
      }
    }
    let empty = plans.is_empty();
    *state.slots.borrow_mut() = slots;
    *state.plans.borrow_mut() = plans.into_iter().map(|plan| PlanEntry { plan, active: true }).collect();
    if empty {
      self.terminate(&state, Terminal::Complete);
    }
  }

  /// Keeps the subscription of the source of `slot`, or drops it at once if
  /// the slot has been released meanwhile.
  fn attach(&self, slot: usize, subscription: BoxedSubscription) {
    let mut source = SharedSubscription::default();
    source.add(subscription);
    self.subscription.add(source.clone());

    let state = self.gate.lock();
    let kept = match state.slots.try_borrow_mut() {
      Ok(mut slots) => match slots.get_mut(slot) {
        Some(entry) if !entry.released && !self.is_terminated() => {
          entry.subscription = Some(source.clone());
          true
        }
        _ => false,
      },
      Err(_) => true,
    };
    drop(state);
    if !kept {
      source.unsubscribe();
    }
  }

  pub(crate) fn enqueue<T: Send + 'static>(&self, slot: usize, notification: Notification<T, Err>) {
    let state = self.gate.lock();
    if self.is_terminated() {
      return;
    }
    let overflow = {
      let mut slots = state.slots.borrow_mut();
      let entry = match slots.get_mut(slot) {
        Some(entry) if !entry.released && !entry.completed => entry,
        _ => return,
      };
      let depth = entry.len();
      let is_value = matches!(notification, Notification::Next(_));
      match self.bound {
        Some((capacity, into)) if is_value && depth >= capacity => {
          Some(into(JoinError::QueueOverflow { slot, capacity }))
        }
        _ => {
          match entry.queue_mut::<T, Err>() {
            Some(queue) => queue.push_back(notification),
            None => {
              error!(slot, "join queue holds another item type");
              return;
            }
          }
          entry.completed = !is_value;
          trace!(slot, depth = depth + 1, "queued notification");
          None
        }
      }
    };
    match overflow {
      Some(err) => {
        warn!(slot, "join queue overflow");
        self.terminate(&state, Terminal::Error(err));
      }
      None => self.dispatch(&state),
    }
  }

  pub(crate) fn source_error(&self, slot: usize, err: Err) {
    let state = self.gate.lock();
    let released = state.slots.try_borrow().map_or(false, |slots| slots.get(slot).map_or(true, |s| s.released));
    if released {
      return;
    }
    debug!(slot, "join source failed");
    self.terminate(&state, Terminal::Error(err));
    self.settle(&state);
  }

  fn dispose(&self) {
    let state = self.gate.lock();
    self.terminate(&state, Terminal::Dispose);
    self.settle(&state);
  }

  fn queue_lengths(&self) -> Vec<usize> {
    let state = self.gate.lock();
    let lengths = state.slots.try_borrow().map(|slots| slots.iter().map(Slot::len).collect());
    lengths.unwrap_or_default()
  }

  /// Matches plans until nothing changes. A nested call, from a callback of
  /// the running dispatch, only asks for one more pass.
  fn dispatch(&self, state: &WhenState<R, Err>) {
    if state.dispatching.get() {
      state.rerun.set(true);
      return;
    }
    state.dispatching.set(true);
    let flag = Dispatching(&state.dispatching);
    loop {
      state.rerun.set(false);
      let progressed = self.match_pass(state);
      if self.is_terminated() || !(progressed || state.rerun.get()) {
        break;
      }
    }
    drop(flag);
    self.settle(state);
  }

  /// One pass over the active plans in registration order. Each plan fires at
  /// most once.
  fn match_pass(&self, state: &WhenState<R, Err>) -> bool {
    let mut progressed = false;
    let count = state.plans.borrow().len();
    for idx in 0..count {
      if self.is_terminated() {
        break;
      }
      let readiness = {
        let plans = state.plans.borrow();
        let entry = &plans[idx];
        if !entry.active {
          continue;
        }
        entry.plan.readiness(&state.slots.borrow())
      };
      match readiness {
        Readiness::NotReady => {}
        Readiness::Exhausted => {
          progressed = true;
          self.exhaust(state, idx);
        }
        Readiness::Ready => {
          let fired = state.plans.borrow_mut()[idx].plan.fire(&state.slots);
          match fired {
            Some(Ok(value)) => {
              progressed = true;
              let mut downstream = state.downstream.borrow_mut();
              if let Some(observer) = downstream.as_mut() {
                observer.next(value);
              }
            }
            Some(Err(err)) => {
              progressed = true;
              debug!(plan = idx, "join selector failed");
              self.terminate(state, Terminal::Error(err));
            }
            None => error!(plan = idx, "ready plan found nothing to dequeue"),
          }
        }
      }
    }
    trace!(progressed, "dispatch pass");
    progressed
  }

  /// Retires plan `idx` and releases the slots no active plan reads any
  /// more. Completes downstream when it was the last plan.
  fn exhaust(&self, state: &WhenState<R, Err>, idx: usize) {
    let operands = {
      let mut plans = state.plans.borrow_mut();
      plans[idx].active = false;
      distinct(plans[idx].plan.slots())
    };
    debug!(plan = idx, "join plan exhausted");

    let released: Vec<SharedSubscription> = {
      let mut slots = state.slots.borrow_mut();
      operands
        .iter()
        .filter_map(|slot| {
          let entry = &mut slots[*slot];
          entry.plans -= 1;
          if entry.plans > 0 {
            return None;
          }
          debug!(slot = *slot, "join source released");
          entry.released = true;
          entry.clear();
          entry.subscription.take()
        })
        .collect()
    };
    for mut subscription in released {
      subscription.unsubscribe();
    }

    if state.plans.borrow().iter().all(|entry| !entry.active) {
      self.terminate(state, Terminal::Complete);
    }
  }

  /// Moves to the terminated state, once. Downstream hears about it right
  /// away unless it is busy in `next`; then the running dispatch delivers
  /// it on its way out.
  fn terminate(&self, state: &WhenState<R, Err>, terminal: Terminal<Err>) {
    if self.terminated.swap(true, Ordering::AcqRel) {
      return;
    }
    debug!(
      reason = match terminal {
        Terminal::Complete => "complete",
        Terminal::Error(_) => "error",
        Terminal::Dispose => "dispose",
      },
      "join terminated"
    );
    self.deliver(state, terminal);

    if let Ok(mut slots) = state.slots.try_borrow_mut() {
      for slot in slots.iter_mut() {
        slot.clear();
        slot.released = true;
        slot.subscription = None;
      }
    }
    self.subscription.clone().unsubscribe();
    if !state.dispatching.get() {
      if let Ok(mut plans) = state.plans.try_borrow_mut() {
        plans.clear();
      }
    }
  }

  fn deliver(&self, state: &WhenState<R, Err>, terminal: Terminal<Err>) {
    let observer = match state.downstream.try_borrow_mut() {
      Ok(mut downstream) => downstream.take(),
      Err(_) => {
        *state.deferred.borrow_mut() = Some(terminal);
        return;
      }
    };
    if let Some(mut observer) = observer {
      match terminal {
        Terminal::Complete => observer.complete(),
        Terminal::Error(err) => observer.error(err),
        Terminal::Dispose => {}
      }
    }
  }

  /// Finishes a termination that happened during a dispatch.
  fn settle(&self, state: &WhenState<R, Err>) {
    if !self.is_terminated() || state.dispatching.get() {
      return;
    }
    if let Ok(mut plans) = state.plans.try_borrow_mut() {
      plans.clear();
    }
    let deferred = state.deferred.borrow_mut().take();
    if let Some(terminal) = deferred {
      self.deliver(state, terminal);
    }
  }
}
