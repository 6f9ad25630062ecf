//! Core model for the bitemporal record visualizer
//!
//! This crate holds the pieces everything else is built on: wire-date
//! parsing, the bitemporal record and interval types, visible-domain
//! computation for the two time axes, and the ordered subscriber
//! registries behind the notification bus.

pub mod domain;
pub mod events;
pub mod record;
pub mod time;

pub use domain::{AxisBounds, DomainBounds};
pub use events::{SubscriptionId, Subscribers};
pub use record::{
    BitemporalExtent, BitemporalRecord, Bound, DatePair, Dataset, DatasetKey, Interval,
};
