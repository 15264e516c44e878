//! Operators built on subjects: the multicast family and reference counting.
//!
//! The entry points live on [`ObservableExt`](crate::observable::ObservableExt):
//! `multicast`, `multicast_factory`, `multicast_selector`, `publish`,
//! `replay`, `publish_behavior`, `share` and `share_replay`.

pub mod multicast;
pub mod ref_count;
