//! HTTP surface of the exporter: the Prometheus scrape endpoint plus a few
//! small pages for humans and health checks.

#[macro_use]
extern crate tracing;

pub mod error;
pub mod exposition;
pub mod router;

pub use router::create_router;
