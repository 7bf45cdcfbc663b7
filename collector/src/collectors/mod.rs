//! # Collectors Module
//!
//! Turns ConoHa API responses into metric samples.
//!
//! - **`Collector` trait**: one category of upstream data (compute, database, ...)
//! - **`ComputeCollector`**: CPU, disk and interface usage per instance
//! - **`DatabaseCollector`**: database sizes and per-service quota
//! - **`ObjectStorageCollector`**: request counts and storage usage
//! - **`BillingCollector`**: remaining deposit
//! - **`SnapshotCollector`**: runs all of the above on an interval and publishes complete snapshots

pub mod billing_collector;
pub mod collector;
pub mod compute_collector;
pub mod database_collector;
pub mod object_storage_collector;
pub mod snapshot_collector;

pub use billing_collector::BillingCollector;
pub use collector::Collector;
pub use compute_collector::ComputeCollector;
pub use database_collector::DatabaseCollector;
pub use object_storage_collector::ObjectStorageCollector;
pub use snapshot_collector::{
    CollectorStatus,
    SnapshotCollector,
    DEFAULT_REFRESH_INTERVAL,
};
