//! Join calculus over observables.
//!
//! A [`Pattern`] names sources that must all have produced a value; a
//! [`Plan`] binds a selector to a pattern; [`when`] runs several plans over
//! one shared set of join queues:
//!
//! ```
//! use rxjoin::prelude::*;
//!
//! let mut left = Subject::<i32, ()>::new();
//! let mut right = Subject::<i32, ()>::new();
//! let mut ticks = Subject::<(), ()>::new();
//!
//! let sums = left.clone().and(right.clone()).then(|l, r| l + r);
//! let heartbeats = ticks.clone().then(|_| 0);
//! when([sums, heartbeats]).subscribe(|v| println!("{}", v));
//!
//! left.next(1);
//! ticks.next(());
//! right.next(2);
//! ```
//!
//! Values wait in a FIFO queue per distinct source until a plan consumes
//! them. Plans are tried in the order they were passed, each one firing at
//! most once per pass, and passes repeat until none of them can make
//! progress.

mod active_plan;
pub mod config;
mod join_observer;
pub mod pattern;
pub mod plan;
mod when;

pub use config::JoinConfig;
pub use pattern::Pattern;
pub use plan::Plan;
pub use when::{when, When, WhenSubscription};
