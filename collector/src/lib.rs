//! # ConoHa Collector
//!
//! Periodically gathers usage data from the ConoHa API and keeps the latest
//! complete result as an immutable [`Snapshot`].
//!
//! ## Architecture
//!
//! - **`metrics`**: descriptors, samples and the snapshot types
//! - **`collectors`**: one collector per upstream category plus the
//!   [`SnapshotCollector`] that drives them
//!
//! Readers never block on upstream I/O: they clone the `Arc` of the current
//! snapshot, while a new one is assembled off to the side and swapped in only
//! once every collector succeeded.

#[macro_use]
extern crate tracing;

pub mod collectors;
pub mod metrics;

pub use collectors::*;
pub use metrics::*;
