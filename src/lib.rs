//! # rxjoin: join patterns and multicasting for Reactive Extensions
//!
//! Coordinates several observable streams: join patterns that fire when a
//! set of sources have all produced a value, and connectable observables
//! that share one upstream subscription among many observers.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxjoin::prelude::*;
//!
//! let mut bids = Subject::<u32, ()>::new();
//! let mut asks = Subject::<u32, ()>::new();
//!
//! when([bids.clone().and(asks.clone()).then(|bid, ask| ask - bid)])
//!   .subscribe(|spread| println!("spread: {}", spread));
//!
//! bids.next(99);
//! asks.next(101);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | A source of `next`, `error` and `complete` notifications |
//! | [`Subject`] | Observer and observable at once, broadcasting to every subscriber |
//! | [`Pattern`] / [`Plan`] | Conjunctions of sources, and a selector bound to one |
//! | [`when`] | Runs plans over shared, per-source join queues |
//! | [`ConnectableObservable`] | Multicasts one upstream subscription once connected |
//!
//! All types are thread-safe. Notifications into one observer are never
//! delivered concurrently.
//!
//! [`Observable`]: observable::Observable
//! [`Subject`]: subject::Subject
//! [`Pattern`]: join::Pattern
//! [`Plan`]: join::Plan
//! [`when`]: join::when()
//! [`ConnectableObservable`]: observable::ConnectableObservable

pub mod error;
pub mod join;
pub mod notification;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod subject;
pub mod subscriber;
pub mod subscription;
